//! # pdugen: schema-driven PDU code generator
//!
//! Reads a markup schema describing protocol data units (classes with typed
//! attributes, single inheritance, nested classes, fixed and counted lists) and
//! generates, per class and per target language, the five operations every PDU
//! needs: initializer, marshal, unmarshal, marshalled size and equality.
//!
//! ## Pipeline
//!
//! - [`loader`]: event-driven schema loader over [`markup`] (PEST grammar)
//! - [`validate`]: whole-registry checks, reported as [`Diagnostic`]s
//! - [`contract`]: per-class [`ClassPlan`], the backend-neutral description of the five operations
//! - [`backend`]: renderers ([`RustBackend`], [`JavaBackend`])
//! - [`pipeline`]: load, validate, generate in parallel, write
//!
//! [`Codec`] executes a plan directly on dynamic [`Value`]s. The
//! `demos/dis-pdus` workspace member compiles generated Rust and checks it
//! against the same interpreter.
//!
//! ## Example schema
//!
//! ```text
//! <classes>
//!   <rust derives="Hash"/>
//!   <class name="Foo" xmlRootElement="true">
//!     <attribute name="count"><primitive type="unsigned short"/></attribute>
//!     <attribute name="items">
//!       <list type="variable" countFieldName="count"><primitive type="int"/></list>
//!     </attribute>
//!   </class>
//! </classes>
//! ```
//!
//! Wire format is big-endian, ancestors first, fields in declaration order, no
//! padding. `count` above is a dynamic length field: it is written as the live
//! length of `items`, whatever value it holds.

pub mod ast;
pub mod backend;
pub mod codec;
pub mod contract;
pub mod loader;
pub mod markup;
pub mod pipeline;
pub mod validate;
pub mod value;

pub use ast::{BackendConfig, ClassRegistry, FieldDef, FieldKind, PrimitiveType, Schema, SchemaClass};
pub use backend::{Backend, JavaBackend, RustBackend};
pub use codec::{Codec, CodecError, Endianness};
pub use contract::{ClassPlan, GenError};
pub use loader::{load_schema, LoadError, LoadedSchema};
pub use pipeline::{run, BackendTarget, PipelineError, RunReport};
pub use validate::{validate, Diagnostic, DiagnosticKind, Severity};
pub use value::{Object, Value};
