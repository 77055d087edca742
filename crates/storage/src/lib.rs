pub mod file;
pub mod memory;
pub mod session;
pub mod store;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use session::{PlaceOrderStore, SessionCart, SessionCartError};
pub use store::{keys, ClientStorage, StorageError};
