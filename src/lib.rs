//! An in-process machine-learning serving and training runtime that
//! guarantees zero-downtime model updates.
//!
//! While a model is retraining on newly arrived data, the previous version
//! keeps serving predictions; the freshly trained candidate replaces it
//! atomically only after it clears a validation gate against the incumbent.
//!
//! ## Architecture
//!
//! ```text
//! caller -> add_training_example -> Buffer -> Trainer (periodic drain)
//!                                                   |
//!                                                   v
//!                                             fit candidate
//!                                                   |
//!                                                   v
//!                                         Validator vs incumbent
//!                                          /                  \
//!                                   commit (swap)          discard
//!
//! caller -> predict -> Cell.load() (lock-free) -> response(version)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use hotswap_ml::{Runtime, LearningConfig, ModelHyperparameters, Family, Example};
//!
//! # async fn example() -> hotswap_ml::Result<()> {
//! let runtime = Runtime::new(LearningConfig::frequent_updates());
//! runtime.register_model("price", Family::Linear, ModelHyperparameters::default())?;
//!
//! for x in 0..20 {
//!     let x = x as f64;
//!     runtime
//!         .add_training_example("price", Example::new(vec![x], 2.0 * x + 1.0), false)
//!         .await?;
//! }
//!
//! runtime.start_continuous_learning();
//! // ... time passes, the trainer commits version 1 ...
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod cell;
pub mod config;
pub mod entry;
pub mod error;
pub mod estimator;
pub mod example;
pub mod registry;
pub mod runtime;
pub mod stats;
pub mod trainer;
pub mod validator;

pub use config::{LearningConfig, ModelHyperparameters};
pub use error::{Error, Result};
pub use example::Example;
pub use estimator::Family;
pub use runtime::{BatchPredictionResponse, ModelInfo, PredictionResponse, Runtime};
