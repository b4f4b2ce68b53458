// UI components for the dashboard

pub mod toast;

pub use toast::{Toast, ToastKind};
