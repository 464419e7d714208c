//! Document model and the resource list envelope.
//!
//! Functions exchange a `ResourceList` over stdin/stdout:
//!
//! ```yaml
//! apiVersion: config.kubernetes.io/v1
//! kind: ResourceList
//! items: [...]
//! functionConfig: {...}
//! ```
//!
//! In standalone mode the input may also be a bare multi-document YAML
//! stream; [`InputStream`] remembers which form was read so the output can
//! be written back the same way.

use crate::error::DocumentError;
use crate::node::Node;
use crate::result::FunctionResult;

/// apiVersion written on envelopes this crate creates.
pub const RESOURCE_LIST_API_VERSION: &str = "config.kubernetes.io/v1";

/// Kind of the resource list envelope.
pub const RESOURCE_LIST_KIND: &str = "ResourceList";

/// A single structured document.
///
/// The tree is kept as parsed, scalar text included; this type only adds
/// read accessors for the identifying fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource(Node);

impl Resource {
    /// Wrap a parsed node.
    pub fn new(node: Node) -> Self {
        Self(node)
    }

    /// Parse a single document from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, DocumentError> {
        Node::parse(content).map(Self)
    }

    /// The underlying tree.
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// Consume the resource and return the underlying tree.
    pub fn into_node(self) -> Node {
        self.0
    }

    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion").and_then(Node::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Node::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// The `data` field of a ConfigMap-shaped document.
    pub fn data(&self) -> Option<&Node> {
        self.0.get("data")
    }

    /// True when the document is null or an empty mapping.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short `apiVersion/kind name` label used in log lines.
    pub fn describe(&self) -> String {
        format!(
            "{}/{} {}",
            self.api_version().unwrap_or("<none>"),
            self.kind().unwrap_or("<none>"),
            self.name().unwrap_or("<unnamed>")
        )
    }

    /// Render the document as YAML.
    pub fn to_yaml(&self) -> String {
        self.0.to_yaml()
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(Node::as_str)
    }
}

/// The function protocol envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceList {
    pub api_version: String,
    pub kind: String,

    /// Documents in pipeline order.
    pub items: Vec<Resource>,

    /// Per-invocation function configuration.
    pub function_config: Option<Resource>,

    /// Diagnostics produced by this function. Results from earlier functions
    /// in the pipeline are not carried forward.
    pub results: Option<FunctionResult>,
}

impl ResourceList {
    /// Build an envelope around `items`.
    pub fn new(items: Vec<Resource>, function_config: Option<Resource>) -> Self {
        Self {
            api_version: RESOURCE_LIST_API_VERSION.to_string(),
            kind: RESOURCE_LIST_KIND.to_string(),
            items,
            function_config,
            results: None,
        }
    }

    /// Parse a single ResourceList document.
    pub fn from_yaml(content: &str) -> Result<Self, DocumentError> {
        Self::from_node(Node::parse(content)?)
    }

    fn from_node(node: Node) -> Result<Self, DocumentError> {
        let kind = node.get("kind").and_then(Node::as_str).unwrap_or("");
        if kind != RESOURCE_LIST_KIND {
            return Err(DocumentError::NotAResourceList {
                found: kind.to_string(),
            });
        }
        let api_version = node
            .get("apiVersion")
            .and_then(Node::as_str)
            .unwrap_or(RESOURCE_LIST_API_VERSION)
            .to_string();

        let items = match node.get("items") {
            None => Vec::new(),
            Some(items) if items.is_null() => Vec::new(),
            Some(items) => items
                .as_sequence()
                .ok_or_else(|| DocumentError::InvalidEnvelope {
                    reason: format!("items is a {}, not a sequence", items.type_name()),
                })?
                .to_vec(),
        };
        if let Some(index) = items.iter().position(|item| !item.is_mapping()) {
            return Err(DocumentError::InvalidItem { index });
        }

        let function_config = node
            .get("functionConfig")
            .filter(|config| !config.is_null())
            .cloned()
            .map(Resource);

        Ok(Self {
            api_version,
            kind: kind.to_string(),
            items: items.into_iter().map(Resource).collect(),
            function_config,
            results: None,
        })
    }

    /// The envelope as a document tree, fields in protocol order.
    pub fn to_node(&self) -> Node {
        let mut entries = vec![
            ("apiVersion", Node::string(&self.api_version)),
            ("kind", Node::string(&self.kind)),
            (
                "items",
                Node::sequence(self.items.iter().map(|item| item.0.clone()).collect()),
            ),
        ];
        if let Some(config) = &self.function_config {
            entries.push(("functionConfig", config.0.clone()));
        }
        if let Some(results) = &self.results {
            entries.push(("results", results.to_node()));
        }
        Node::mapping(entries)
    }

    /// Serialise the envelope back to YAML.
    pub fn to_yaml(&self) -> String {
        self.to_node().to_yaml()
    }
}

/// How the input was framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputForm {
    /// A single ResourceList document.
    ResourceList,
    /// A bare multi-document YAML stream of items.
    Stream,
}

/// Parsed input plus the framing it arrived in.
#[derive(Debug, Clone)]
pub struct InputStream {
    pub list: ResourceList,
    pub form: InputForm,
}

impl InputStream {
    /// Parse either a ResourceList envelope or a bare document stream.
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        let mut documents: Vec<Node> = Node::parse_stream(content)?
            .into_iter()
            .filter(|doc| !doc.is_null())
            .collect();

        let is_envelope = documents.len() == 1
            && documents[0].get("kind").and_then(Node::as_str) == Some(RESOURCE_LIST_KIND);
        if is_envelope {
            let node = documents.remove(0);
            return Ok(Self {
                list: ResourceList::from_node(node)?,
                form: InputForm::ResourceList,
            });
        }

        if let Some(index) = documents.iter().position(|doc| !doc.is_mapping()) {
            return Err(DocumentError::InvalidItem { index });
        }
        tracing::debug!(count = documents.len(), "read bare document stream");

        Ok(Self {
            list: ResourceList::new(documents.into_iter().map(Resource::new).collect(), None),
            form: InputForm::Stream,
        })
    }

    /// Render `list` in the same framing the input used.
    ///
    /// A bare stream has nowhere to carry results, so they are omitted there.
    pub fn render(&self, list: &ResourceList) -> String {
        match self.form {
            InputForm::ResourceList => list.to_yaml(),
            InputForm::Stream => list
                .items
                .iter()
                .map(Resource::to_yaml)
                .collect::<Vec<_>>()
                .join("---\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ResultItem, Severity};

    const LIST: &str = r#"
apiVersion: config.kubernetes.io/v1
kind: ResourceList
items:
  - apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
      namespace: prod
    spec:
      replicas: 3
  - apiVersion: v1
    kind: Service
    metadata:
      name: web
functionConfig:
  apiVersion: v1
  kind: ConfigMap
  metadata:
    name: fn-config
  data:
    key: value
"#;

    #[test]
    fn test_parse_resource_list() {
        let list = ResourceList::from_yaml(LIST).unwrap();
        assert_eq!(list.api_version, "config.kubernetes.io/v1");
        assert_eq!(list.items.len(), 2);

        let deployment = &list.items[0];
        assert_eq!(deployment.api_version(), Some("apps/v1"));
        assert_eq!(deployment.kind(), Some("Deployment"));
        assert_eq!(deployment.name(), Some("web"));
        assert_eq!(deployment.namespace(), Some("prod"));
        assert_eq!(list.items[1].namespace(), None);

        let config = list.function_config.as_ref().unwrap();
        assert_eq!(config.kind(), Some("ConfigMap"));
        assert_eq!(
            config.data().and_then(Node::as_mapping).map(|d| d.len()),
            Some(1)
        );
    }

    #[test]
    fn test_reject_other_kinds() {
        let err = ResourceList::from_yaml("apiVersion: v1\nkind: ConfigMap\n").unwrap_err();
        assert!(matches!(err, DocumentError::NotAResourceList { found } if found == "ConfigMap"));
    }

    #[test]
    fn test_reject_scalar_item() {
        let yaml = "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems:\n  - just a string\n";
        let err = ResourceList::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidItem { index: 0 }));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            ResourceList::from_yaml("").unwrap_err(),
            DocumentError::Empty
        ));
    }

    #[test]
    fn test_roundtrip_preserves_items() {
        let list = ResourceList::from_yaml(LIST).unwrap();
        let reparsed = ResourceList::from_yaml(&list.to_yaml()).unwrap();
        assert_eq!(list, reparsed);
    }

    #[test]
    fn test_results_serialised_after_items() {
        let mut list = ResourceList::from_yaml(LIST).unwrap();
        list.results = Some(FunctionResult::new(
            "block-mutation",
            vec![ResultItem::new("boom", Severity::Error)],
        ));
        let yaml = list.to_yaml();
        let items_at = yaml.find("items:").unwrap();
        let results_at = yaml.find("results:").unwrap();
        assert!(results_at > items_at);
        assert!(yaml.contains("name: block-mutation"));
        assert!(yaml.contains("severity: error"));
    }

    #[test]
    fn test_reject_items_that_are_not_a_list() {
        let yaml = "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems: 3\n";
        assert!(matches!(
            ResourceList::from_yaml(yaml).unwrap_err(),
            DocumentError::InvalidEnvelope { .. }
        ));
    }

    #[test]
    fn test_items_are_written_back_as_authored() {
        let yaml = r#"apiVersion: config.kubernetes.io/v1
kind: ResourceList
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: settings
    data:
      version: 1.10
      port: 0x1F
      enabled: yes
      note: "quoted"
"#;
        let list = ResourceList::from_yaml(yaml).unwrap();
        assert_eq!(list.to_yaml(), yaml);
    }

    #[test]
    fn test_input_stream_detects_envelope() {
        let input = InputStream::parse(LIST).unwrap();
        assert_eq!(input.form, InputForm::ResourceList);
        assert_eq!(input.list.items.len(), 2);
    }

    #[test]
    fn test_input_stream_reads_bare_documents() {
        let yaml = "apiVersion: v1\nkind: Service\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: b\n";
        let input = InputStream::parse(yaml).unwrap();
        assert_eq!(input.form, InputForm::Stream);
        assert!(input.list.function_config.is_none());
        let names: Vec<_> = input.list.items.iter().filter_map(Resource::name).collect();
        assert_eq!(names, ["a", "b"]);

        let rendered = input.render(&input.list);
        assert_eq!(rendered.matches("---").count(), 1);
        assert!(!rendered.contains("ResourceList"));
    }

    #[test]
    fn test_empty_resource_checks() {
        assert!(Resource::new(Node::null()).is_empty());
        assert!(Resource::from_yaml("{}").unwrap().is_empty());
        assert!(!Resource::from_yaml("kind: ConfigMap").unwrap().is_empty());
    }
}
