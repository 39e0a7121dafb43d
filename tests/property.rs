//! Property-based tests for verifying invariants.

mod common;

#[path = "property/normalize_props.rs"]
mod normalize_props;

#[path = "property/parser_props.rs"]
mod parser_props;

#[path = "property/heap_props.rs"]
mod heap_props;

#[path = "property/index_props.rs"]
mod index_props;

#[path = "property/scoring_props.rs"]
mod scoring_props;
