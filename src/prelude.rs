pub use crate::err::*;
pub use crate::protocol::{ErrorDetails, Progress, Reply, Request, RequestId};
pub use crate::client::Client;
pub use crate::client::builder::ClientBuilder;
pub use crate::client::handle::Handle;
pub use crate::entrypoint::{Entrypoint, Version};
