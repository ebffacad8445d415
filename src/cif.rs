//! Minimal CIF/STAR reader: data blocks, single items, loops, quoted values and
//! `;` text fields. Enough for `_atom_site` coordinates and structure factor files.

use serde::Serialize;

use crate::error::RcsbError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CifValue {
    Text(String),
    /// `.`
    Inapplicable,
    /// `?`
    Unknown,
}

impl CifValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CifValue::Text(text) => Some(text),
            CifValue::Inapplicable | CifValue::Unknown => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|text| text.parse().ok())
    }

    pub fn is_null(&self) -> bool {
        self.as_str().is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    DataBlock(String),
    Loop,
    Tag(String),
    Value(CifValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CifLoop {
    pub tags: Vec<String>,
    pub rows: Vec<Vec<CifValue>>,
}

impl CifLoop {
    /// Column index of `tag`. Tags compare case-insensitively.
    pub fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|name| name.eq_ignore_ascii_case(tag))
    }

    pub fn category(&self) -> Option<&str> {
        self.tags.first().map(|tag| tag_category(tag))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CifBlock {
    pub name: String,
    pub items: Vec<(String, CifValue)>,
    pub loops: Vec<CifLoop>,
}

impl CifBlock {
    pub fn item(&self, tag: &str) -> Option<&CifValue> {
        self.items
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, value)| value)
    }

    /// All rows of `category` (e.g. `_atom_site`). A category written as single
    /// items comes back as a one-row loop.
    pub fn category(&self, category: &str) -> Option<CifLoop> {
        if let Some(found) = self
            .loops
            .iter()
            .find(|cif_loop| cif_loop.category().is_some_and(|name| name.eq_ignore_ascii_case(category)))
        {
            return Some(found.clone());
        }

        let (tags, values): (Vec<String>, Vec<CifValue>) = self
            .items
            .iter()
            .filter(|(tag, _)| tag_category(tag).eq_ignore_ascii_case(category))
            .cloned()
            .unzip();
        if tags.is_empty() {
            return None;
        }
        Some(CifLoop {
            tags,
            rows: vec![values],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CifDocument {
    pub blocks: Vec<CifBlock>,
}

impl CifDocument {
    pub fn parse(input: &str) -> Result<Self, RcsbError> {
        let tokens = tokenize(input)?;
        let mut blocks: Vec<CifBlock> = Vec::new();
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            if let Token::DataBlock(name) = token {
                blocks.push(CifBlock {
                    name,
                    ..CifBlock::default()
                });
                continue;
            }
            let Some(block) = blocks.last_mut() else {
                return Err(RcsbError::StructureParse(
                    "CIF content before the first data_ block".to_string(),
                ));
            };
            match token {
                Token::Tag(tag) => match iter.next() {
                    Some(Token::Value(value)) => block.items.push((tag, value)),
                    _ => {
                        return Err(RcsbError::StructureParse(format!(
                            "CIF item {tag} has no value"
                        )));
                    }
                },
                Token::Loop => {
                    let mut cif_loop = CifLoop::default();
                    while let Some(Token::Tag(_)) = iter.peek() {
                        if let Some(Token::Tag(tag)) = iter.next() {
                            cif_loop.tags.push(tag);
                        }
                    }
                    if cif_loop.tags.is_empty() {
                        return Err(RcsbError::StructureParse("loop_ without tags".to_string()));
                    }
                    let mut values = Vec::new();
                    while let Some(Token::Value(_)) = iter.peek() {
                        if let Some(Token::Value(value)) = iter.next() {
                            values.push(value);
                        }
                    }
                    let width = cif_loop.tags.len();
                    if values.len() % width != 0 {
                        return Err(RcsbError::StructureParse(format!(
                            "loop {} has {} values for {width} columns",
                            cif_loop.tags[0],
                            values.len()
                        )));
                    }
                    cif_loop.rows = values.chunks(width).map(<[CifValue]>::to_vec).collect();
                    block.loops.push(cif_loop);
                }
                Token::Value(value) => {
                    return Err(RcsbError::StructureParse(format!(
                        "unexpected CIF value {value:?}"
                    )));
                }
                Token::DataBlock(_) => {}
            }
        }

        if blocks.is_empty() {
            return Err(RcsbError::StructureParse("no data_ block found".to_string()));
        }
        Ok(Self { blocks })
    }

    pub fn first_block(&self) -> Option<&CifBlock> {
        self.blocks.first()
    }
}

fn tag_category(tag: &str) -> &str {
    tag.split_once('.').map(|(category, _)| category).unwrap_or(tag)
}

fn tokenize(input: &str) -> Result<Vec<Token>, RcsbError> {
    let mut tokens = Vec::new();
    let mut lines = input.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let Some(first) = line.strip_prefix(';') else {
            tokenize_line(line, index + 1, &mut tokens)?;
            continue;
        };

        let mut text: Vec<&str> = Vec::new();
        if !first.trim().is_empty() {
            text.push(first);
        }
        let mut closing = None;
        for (_, next) in lines.by_ref() {
            if let Some(rest) = next.strip_prefix(';') {
                closing = Some(rest);
                break;
            }
            text.push(next);
        }
        let Some(rest) = closing else {
            return Err(RcsbError::StructureParse(format!(
                "unterminated text field starting at line {}",
                index + 1
            )));
        };
        tokens.push(Token::Value(CifValue::Text(text.join("\n"))));
        tokenize_line(rest, index + 1, &mut tokens)?;
    }
    Ok(tokens)
}

fn tokenize_line(line: &str, number: usize, tokens: &mut Vec<Token>) -> Result<(), RcsbError> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let byte = bytes[pos];
        if byte.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if byte == b'#' {
            break;
        }
        if byte == b'\'' || byte == b'"' {
            // A quote only closes when followed by whitespace or end of line.
            let start = pos + 1;
            let mut end = start;
            loop {
                if end >= bytes.len() {
                    return Err(RcsbError::StructureParse(format!(
                        "unterminated quoted value at line {number}"
                    )));
                }
                if bytes[end] == byte
                    && (end + 1 == bytes.len() || bytes[end + 1].is_ascii_whitespace())
                {
                    break;
                }
                end += 1;
            }
            tokens.push(Token::Value(CifValue::Text(line[start..end].to_string())));
            pos = end + 1;
            continue;
        }
        let start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        tokens.push(classify(&line[start..pos]));
    }
    Ok(())
}

fn classify(word: &str) -> Token {
    let lowered = word.to_ascii_lowercase();
    if lowered.starts_with("data_") {
        return Token::DataBlock(word[5..].to_string());
    }
    if lowered == "loop_" {
        return Token::Loop;
    }
    if word.starts_with('_') {
        return Token::Tag(word.to_string());
    }
    match word {
        "." => Token::Value(CifValue::Inapplicable),
        "?" => Token::Value(CifValue::Unknown),
        _ => Token::Value(CifValue::Text(word.to_string())),
    }
}
