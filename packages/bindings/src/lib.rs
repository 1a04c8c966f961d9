mod msg;

pub use msg::{DenomMetadata, DenomUnit, HyperionMsg, HyperionQuery, HyperionSudoMsg};
