use crate::topology::NodeRecord;

pub type NodeObserver = Box<dyn FnMut(&NodeRecord)>;

#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEvent {
    Selected(NodeRecord),
    Deselected(NodeRecord),
}

#[derive(Default)]
pub(super) struct Observers {
    select: Vec<NodeObserver>,
    deselect: Vec<NodeObserver>,
}

impl Observers {
    pub(super) fn on_select(&mut self, observer: NodeObserver) {
        self.select.push(observer);
    }

    pub(super) fn on_deselect(&mut self, observer: NodeObserver) {
        self.deselect.push(observer);
    }

    pub(super) fn emit(&mut self, event: &SelectionEvent) {
        let (observers, node) = match event {
            SelectionEvent::Selected(node) => (&mut self.select, node),
            SelectionEvent::Deselected(node) => (&mut self.deselect, node),
        };
        for observer in observers.iter_mut() {
            observer(node);
        }
    }
}
