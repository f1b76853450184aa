// styx — command-line tool descriptors to typed parameter bindings
//
// Library root. Stages in data-flow order: tokenize/destructure →
// frontend → pass pipeline → solver, with typemap and schema as
// downstream consumers of the solved bindings.

pub mod bindings;
pub mod canonicalize;
pub mod destructure;
pub mod diag;
pub mod flatten;
pub mod frontend;
pub mod id;
pub mod ir;
pub mod pass;
pub mod pipeline;
pub mod remove_empty;
pub mod schema;
pub mod simplify;
pub mod solver;
pub mod tokenize;
pub mod typemap;
