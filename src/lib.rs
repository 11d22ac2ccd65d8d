mod types;
pub use types::*;

mod keys;
pub use keys::*;

mod x3dh;
pub use x3dh::*;

mod session;
pub use session::*;

mod proto;

mod store;
pub use store::*;

mod error;
pub use error::Error;

mod account;
pub use account::*;
