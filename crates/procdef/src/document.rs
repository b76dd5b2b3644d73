//! 流程定义的元素树
//!
//! 节点存放在 [`Document`] 的扁平 arena 中，[`Element`] 是指向其中的 `Copy` 句柄。
//! 标签按本地名匹配，`pd:activity` 与 `activity` 视为同一元素。

/// [`Document`] 内的节点索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// 解析后的定义文档，第一个节点为根
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &mut self,
        name: String,
        attributes: Vec<(String, String)>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name,
            attributes,
            text: String::new(),
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text.push_str(text);
    }

    pub(crate) fn name_of(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// 根元素 (空文档为 `None`)
    pub fn root(&self) -> Option<Element<'_>> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(Element { doc: self, id: NodeId(0) })
        }
    }

    /// 元素数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// 元素句柄
#[derive(Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> Element<'d> {
    fn data(&self) -> &'d NodeData {
        &self.doc.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// 原始标签名，如 `pd:activity`
    pub fn name(&self) -> &'d str {
        &self.data().name
    }

    /// 去掉命名空间前缀的标签名
    pub fn local_name(&self) -> &'d str {
        local_name(self.name())
    }

    /// 本地名是否等于 `tag` (忽略前缀)
    pub fn is(&self, tag: &str) -> bool {
        self.local_name() == local_name(tag)
    }

    /// 按名称取属性，找不到时按本地名匹配
    pub fn attr(&self, name: &str) -> Option<&'d str> {
        let attributes = &self.data().attributes;
        attributes
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| {
                let wanted = local_name(name);
                attributes.iter().find(|(k, _)| local_name(k) == wanted)
            })
            .map(|(_, v)| v.as_str())
    }

    /// 元素自身的文本 (已 trim)
    pub fn text(&self) -> &'d str {
        self.data().text.trim()
    }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.data().parent.map(|id| Element { doc: self.doc, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Element<'d>> + 'd {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| Element { doc, id })
    }

    /// 第一个匹配标签的直接子元素
    pub fn child(&self, tag: &str) -> Option<Element<'d>> {
        self.children().find(|c| c.is(tag))
    }

    /// 所有匹配标签的直接子元素 (文档顺序)
    pub fn children_named<'a>(&self, tag: &'a str) -> impl Iterator<Item = Element<'d>> + 'a
    where
        'd: 'a,
    {
        let wanted = local_name(tag);
        self.children().filter(move |c| c.local_name() == wanted)
    }

    /// 第一个匹配子元素的文本，空文本视为不存在
    pub fn child_text(&self, tag: &str) -> Option<&'d str> {
        self.child(tag).map(|c| c.text()).filter(|t| !t.is_empty())
    }

    /// 是否有祖先元素匹配该标签
    pub fn has_ancestor(&self, tag: &str) -> bool {
        let mut current = self.parent();
        while let Some(element) = current {
            if element.is(tag) {
                return true;
            }
            current = element.parent();
        }
        false
    }
}

impl std::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name())
            .field("children", &self.data().children.len())
            .finish()
    }
}

/// 去掉命名空间前缀: `pd:group` -> `group`
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        let root = doc.push("pd:ProcessDefinition".to_string(), vec![], None);
        let act = doc.push(
            "pd:activity".to_string(),
            vec![("name".to_string(), "Log".to_string())],
            Some(root),
        );
        let ty = doc.push("pd:type".to_string(), vec![], Some(act));
        doc.append_text(ty, "  com.tibco.pe.core.WriteToLogActivity\n");
        doc.push("pd:transition".to_string(), vec![], Some(root));
        doc.push("pd:activity".to_string(), vec![], Some(root));
        doc
    }

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(local_name("pd:activity"), "activity");
        assert_eq!(local_name("activity"), "activity");
    }

    #[test]
    fn test_child_lookup_ignores_prefix() {
        let doc = sample();
        let root = doc.root().unwrap();
        let act = root.child("activity").unwrap();
        assert_eq!(act.name(), "pd:activity");
        assert_eq!(act.attr("name"), Some("Log"));
        assert_eq!(
            act.child_text("pd:type"),
            Some("com.tibco.pe.core.WriteToLogActivity")
        );
    }

    #[test]
    fn test_children_named_keeps_document_order() {
        let doc = sample();
        let root = doc.root().unwrap();
        assert_eq!(root.children_named("pd:activity").count(), 2);
        assert_eq!(root.children_named("transition").count(), 1);
    }

    #[test]
    fn test_has_ancestor() {
        let doc = sample();
        let ty = doc.root().unwrap().child("activity").unwrap().child("type").unwrap();
        assert!(ty.has_ancestor("activity"));
        assert!(ty.has_ancestor("ProcessDefinition"));
        assert!(!ty.has_ancestor("group"));
    }

    #[test]
    fn test_empty_text_is_absent() {
        let doc = sample();
        let root = doc.root().unwrap();
        assert_eq!(root.child_text("transition"), None);
        assert_eq!(root.child_text("missing"), None);
    }

    #[test]
    fn test_empty_document_has_no_root() {
        let doc = Document::new();
        assert!(doc.root().is_none());
        assert!(doc.is_empty());
    }
}
