//! acuquiz-core: bank parsing, quiz sessions and grading.
//!
//! This crate holds everything that does not talk to the network or the
//! terminal: the text bank parser and catalog, the used-items store, the
//! quiz session state machine, and the grading gateway with its local
//! fallbacks.

pub mod catalog;
pub mod error;
pub mod gateway;
pub mod grading;
pub mod model;
pub mod parser;
pub mod report;
pub mod session;
pub mod store;
pub mod study;
pub mod traits;

pub use catalog::{BankCatalog, BankRegistry, BankSource, BankText};
pub use error::{GatewayError, ParseError, ProviderError, SessionError, StoreError};
pub use gateway::{GatewayConfig, GradeRequest, GradingGateway};
pub use grading::{BuiltQuestion, GradeResult, Subscores};
pub use model::{Bank, Entry, FieldLabel};
pub use report::{BankStats, QuizResult};
pub use session::{QuizSession, SessionState};
pub use store::{JsonUsedItemsStore, MemoryUsedItemsStore};
pub use traits::{ChatRequest, ChatResponse, TextGenerator, UsedItems, UsedItemsStore};
