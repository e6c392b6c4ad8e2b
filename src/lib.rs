//! Data-grid controller: client-side filtering and sorting over a flat row store, tree
//! expansion over parent-linked rows, and a windowed lazy-load protocol against a remote
//! source that holds the full collection.

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod identity;
pub mod item;
pub mod memory;
pub mod mutation;
pub mod sort;
pub mod source;
pub mod store;
pub mod tree;
pub mod window;

#[cfg(test)]
mod fixtures;

pub use config::{FieldMap, GridConfig, LazyLoadConfig, Labels};
pub use controller::{GridController, GridEvent, GridTask, SelectAllState};
pub use error::{GridError, Notice, RemoteError};
pub use filter::{FilterAttribute, MatchOperator, ResultsCount};
pub use identity::IdKind;
pub use item::{Item, Record, RowBackground};
pub use memory::{MemorySource, SourceCall};
pub use sort::{SortDirection, Sorter};
pub use source::{Detached, LazyLoadSource, Page, PageRequest, SubscribeResponse, TreeResponse};
pub use store::FlatStore;
pub use tree::{ExpandedNode, NodeState};
pub use window::{ScrollDirection, ScrollSample, WindowState};
