/*!
Ballots made of voting-method components.

A ballot holds several components (questions), each counted with its own
voting method: yes/no, first-past-the-post, ranked choice (instant-runoff) or
approval voting. This crate validates what voters submit, counts the cast
votes and exports them as a table.

The main entry points are:
- [`service::BallotService`] for the full set of operations on top of a store
- [`builder::Builder`] to assemble a ballot and its votes in memory
- [`results::calculate_results`] and [`export::results_table`] to run the
  counting directly on a snapshot of components and votes

See the [`manual`] for the voting methods and their options.
*/

mod config;
mod error;

pub mod builder;
pub mod export;
pub mod manual;
pub mod methods;
pub mod registry;
pub mod results;
pub mod service;
pub mod store;
pub mod submission;
pub mod validation;

pub use crate::config::*;
pub use crate::error::{BallotError, BallotResult, FieldError, ValidationErrors};
pub use crate::methods::BallotComponentType;
pub use crate::registry::Registry;
pub use crate::results::BallotResults;
