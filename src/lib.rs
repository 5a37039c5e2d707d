//! Markdown parsing and serialization with HTML comment support.
//!
//! Documents flow through a [`Processor`]: source text is tokenized by a set of
//! [`Construct`]s, the events are built into a [`Node`] tree, and the tree is
//! either serialized back to markdown or projected into an [`HtmlNode`] tree.
//! [`CommentExtension`] teaches every stage about `<!-- ... -->`.

mod char;
mod document;
mod error;
mod input_buffer;
mod location;
mod scanner;
mod string;
mod token;

mod builder;
mod comment;
mod config;
mod construct;
mod emitter;
mod extension;
mod html;
mod processor;

pub use builder::*;
pub use char::*;
pub use comment::*;
pub use config::*;
pub use construct::*;
pub use document::*;
pub use emitter::*;
pub use error::*;
pub use extension::*;
pub use html::*;
pub use input_buffer::*;
pub use location::*;
pub use processor::*;
pub use scanner::*;
pub use string::*;
pub use token::*;
