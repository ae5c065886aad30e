use derive_more::{Display, From};
use futures_channel::mpsc::UnboundedSender;

use crate::mirror::AggregateCounts;

pub type UpdateSender = UnboundedSender<MirrorUpdate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Visibility {
    #[display("subtree visible")]
    Shown,
    #[display("subtree hidden")]
    Hidden,
}

/// Everything the sync engine tells the presentation side.
#[derive(Debug, Clone, PartialEq, Eq, Display, From)]
pub enum MirrorUpdate {
    Visibility(Visibility),
    Counts(AggregateCounts),
}
