mod details;
mod devices;
mod panels;
mod scan;
mod toasts;
