pub mod errors;
pub mod fingerprint;
pub mod format;
pub mod params;
pub mod table;
pub mod transient;

pub use errors::*;
pub use fingerprint::*;
pub use format::*;
pub use params::*;
pub use table::*;
pub use transient::*;
