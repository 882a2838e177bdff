pub mod composer;
pub mod dispatcher;
pub mod ingestor;
pub mod scheduler;
pub mod sweeper;
pub mod trigger;

pub use composer::*;
pub use dispatcher::*;
pub use ingestor::*;
pub use scheduler::*;
pub use sweeper::*;
pub use trigger::*;
