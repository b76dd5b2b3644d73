//! procdef - 流程定义读取
//!
//! 将 BusinessWorks 流程文档解析为通用元素树

mod document;
mod reader;

pub use document::{local_name, Document, Element, NodeId};
pub use reader::{parse_file, parse_str, ReadError, Result};
