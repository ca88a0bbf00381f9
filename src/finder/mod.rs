pub mod audit;
pub mod config;
pub mod coverage;
pub mod dates;
pub mod descriptor;
pub mod interval;
pub mod local;
pub mod lock;
pub mod manifest;
pub mod params;
pub mod paths;
pub mod pipeline;
pub mod reconcile;
pub mod source;
pub mod stats;
pub mod util;
pub mod warn;
