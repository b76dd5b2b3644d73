use crate::document::{Document, NodeId};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Attribute error: {0}")]
    Attribute(#[from] AttrError),
    #[error("Document has no root element")]
    NoRoot,
    #[error("Unclosed element: {0}")]
    Unclosed(String),
}

pub type Result<T> = std::result::Result<T, ReadError>;

/// 从字符串解析流程定义
///
/// 用显式栈跟踪嵌套，不做递归
pub fn parse_str(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let id = open_element(&mut doc, &e, stack.last().copied())?;
                stack.push(id);
            }
            Event::Empty(e) => {
                open_element(&mut doc, &e, stack.last().copied())?;
            }
            Event::Text(e) => {
                if let Some(&id) = stack.last() {
                    let text = e.unescape()?;
                    doc.append_text(id, &text);
                }
            }
            Event::CData(e) => {
                if let Some(&id) = stack.last() {
                    let raw = e.into_inner();
                    doc.append_text(id, &String::from_utf8_lossy(&raw));
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(&open) = stack.last() {
        return Err(ReadError::Unclosed(doc.name_of(open).to_string()));
    }
    if doc.is_empty() {
        return Err(ReadError::NoRoot);
    }

    Ok(doc)
}

/// 读取并解析流程定义文件
pub fn parse_file(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    let xml = String::from_utf8_lossy(&bytes);
    tracing::debug!("Parsing {} ({} bytes)", path.display(), bytes.len());
    parse_str(&xml)
}

fn open_element(doc: &mut Document, start: &BytesStart<'_>, parent: Option<NodeId>) -> Result<NodeId> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(doc.push(name, attributes, parent))
}
