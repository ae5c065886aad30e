mod console;
mod update;

pub use console::ConsolePresenter;
pub use update::{MirrorUpdate, UpdateSender, Visibility};
