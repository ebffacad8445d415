use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;

use crate::error::RcsbError;

/// Element tree of an XML document. Text of mixed content is concatenated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn parse(input: &str) -> Result<Self, RcsbError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;
        loop {
            let event = reader
                .read_event()
                .map_err(|err| xml_error(reader.buffer_position(), err))?;
            match event {
                Event::Start(start) => stack.push(Self::open(&start)?),
                Event::Empty(start) => {
                    let node = Self::open(&start)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack.pop().ok_or_else(|| {
                        RcsbError::StructureParse("unbalanced XML end tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|err| xml_error(reader.buffer_position(), err))?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&data));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(RcsbError::StructureParse(format!(
                "unclosed XML element <{}>",
                stack[stack.len() - 1].name
            )));
        }
        root.ok_or_else(|| RcsbError::StructureParse("XML document has no root element".to_string()))
    }

    fn open(start: &BytesStart<'_>) -> Result<Self, RcsbError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|err| RcsbError::StructureParse(err.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|err| RcsbError::StructureParse(err.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Follows a `/` separated path of child names, e.g. `PDBx:atom_siteCategory/PDBx:atom_site`.
    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }
}

fn xml_error(position: u64, err: impl std::fmt::Display) -> RcsbError {
    RcsbError::StructureParse(format!("XML error at byte {position}: {err}"))
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    if let Some(node) = stack.last_mut() {
        node.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), RcsbError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(RcsbError::StructureParse(
            "XML document has more than one root element".to_string(),
        ));
    }
    *root = Some(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_elements_attributes_and_text() {
        let doc = r#"<?xml version="1.0" encoding="UTF-8" ?>
<PDBx:datablock datablockName="4HHB">
  <PDBx:atom_siteCategory>
    <PDBx:atom_site id="1">
      <PDBx:Cartn_x>6.204</PDBx:Cartn_x>
      <PDBx:label_alt_id xsi:nil="true" />
    </PDBx:atom_site>
  </PDBx:atom_siteCategory>
</PDBx:datablock>"#;
        let root = XmlNode::parse(doc).unwrap();
        assert_eq!(root.name, "PDBx:datablock");
        assert_eq!(root.attribute("datablockName"), Some("4HHB"));
        let site = root.find("PDBx:atom_siteCategory/PDBx:atom_site").unwrap();
        assert_eq!(site.attribute("id"), Some("1"));
        assert_eq!(site.child("PDBx:Cartn_x").and_then(|x| x.text.as_deref()), Some("6.204"));
        assert_eq!(site.child("PDBx:label_alt_id").unwrap().attribute("xsi:nil"), Some("true"));
    }

    #[test]
    fn unclosed_element_is_an_error() {
        assert!(XmlNode::parse("<a><b></b>").is_err());
    }
}
