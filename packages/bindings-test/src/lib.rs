mod multitest;

pub use multitest::{
    HyperionApp, HyperionAppWrapped, HyperionModule, SlashRecord, BLOCK_TIME,
    COMMUNITY_POOL_ADDR,
};
