//! Structure file download and light post-processing.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cif::CifDocument;
use crate::client::RcsbClient;
use crate::error::RcsbError;
use crate::fs_util;
use crate::http::Transport;
use crate::structure::{AtomRecord, AtomTable, MmcifReader, PdbReader, StructureReader};
use crate::xml::XmlNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Pdb,
    Cif,
    Xml,
    #[serde(rename = "structfact")]
    StructFact,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Pdb => "pdb",
            FileType::Cif => "cif",
            FileType::Xml => "xml",
            FileType::StructFact => "structfact",
        }
    }

    /// File name suffix on the download server, without compression.
    pub fn suffix(self) -> &'static str {
        match self {
            FileType::Pdb => ".pdb",
            FileType::Cif => ".cif",
            FileType::Xml => ".xml",
            FileType::StructFact => "-sf.cif",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdb" => Ok(FileType::Pdb),
            "cif" => Ok(FileType::Cif),
            "xml" => Ok(FileType::Xml),
            "structfact" => Ok(FileType::StructFact),
            _ => Err(RcsbError::unsupported("filetype", value)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdbFileOptions {
    pub filetype: FileType,
    /// Drop atoms carrying an insertion code.
    pub rm_insert: bool,
    /// Keep only the first alternate location.
    pub rm_alt: bool,
    pub compression: bool,
    pub save: bool,
    /// Download directory; the system temp dir when unset.
    pub path: Option<Utf8PathBuf>,
}

impl Default for PdbFileOptions {
    fn default() -> Self {
        Self {
            filetype: FileType::Pdb,
            rm_insert: false,
            rm_alt: true,
            compression: true,
            save: false,
            path: None,
        }
    }
}

impl PdbFileOptions {
    pub fn new(filetype: FileType) -> Self {
        Self {
            filetype,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdbStructure {
    pub atom: Vec<AtomRecord>,
    pub xyz: Vec<[f64; 3]>,
    pub calpha: Vec<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<Utf8PathBuf>,
}

impl PdbStructure {
    pub fn calpha_count(&self) -> usize {
        self.calpha.iter().filter(|is_ca| **is_ca).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PdbFileResult {
    Coordinates(PdbStructure),
    StructureFactors(CifDocument),
    Xml(XmlNode),
}

fn record_warning(warnings: &mut Vec<String>, message: String) {
    warn!("{message}");
    warnings.push(message);
}

/// Applies alt-loc and insertion filtering, flags duplicate serials and computes
/// the C-alpha mask.
pub fn postprocess(mut table: AtomTable, rm_alt: bool, rm_insert: bool) -> PdbStructure {
    let mut warnings = Vec::new();
    if table.model_count > 1 {
        debug!(models = table.model_count, "keeping the first model only");
    }

    if rm_alt {
        let first_alt = table
            .atoms
            .iter()
            .filter_map(|atom| atom.alt_loc.clone())
            .min();
        if let Some(first_alt) = first_alt {
            record_warning(
                &mut warnings,
                format!("alternate locations present; keeping only alt_loc '{first_alt}'"),
            );
            table.retain(|atom| {
                atom.alt_loc
                    .as_deref()
                    .is_none_or(|alt_loc| alt_loc == first_alt)
            });
        }
    }

    if rm_insert && table.atoms.iter().any(|atom| atom.insertion_code.is_some()) {
        let before = table.len();
        table.retain(|atom| atom.insertion_code.is_none());
        record_warning(
            &mut warnings,
            format!(
                "removed {} atoms with insertion codes",
                before - table.len()
            ),
        );
    }

    let mut seen = HashSet::new();
    let duplicates = table
        .atoms
        .iter()
        .filter_map(|atom| atom.serial)
        .filter(|serial| !seen.insert(*serial))
        .count();
    if duplicates > 0 {
        record_warning(
            &mut warnings,
            format!("{duplicates} duplicate atom serial numbers found"),
        );
    }

    let calpha = table.atoms.iter().map(AtomRecord::is_calpha).collect();
    PdbStructure {
        atom: table.atoms,
        xyz: table.xyz,
        calpha,
        warnings,
        saved_path: None,
    }
}

/// Parses a downloaded file's text according to its type.
pub fn parse_download(
    text: &str,
    filetype: FileType,
    options: &PdbFileOptions,
) -> Result<PdbFileResult, RcsbError> {
    match filetype {
        FileType::Pdb => {
            let table = PdbReader.read(text)?;
            Ok(PdbFileResult::Coordinates(postprocess(
                table,
                options.rm_alt,
                options.rm_insert,
            )))
        }
        FileType::Cif => {
            let table = MmcifReader.read(text)?;
            Ok(PdbFileResult::Coordinates(postprocess(
                table,
                options.rm_alt,
                options.rm_insert,
            )))
        }
        FileType::StructFact => Ok(PdbFileResult::StructureFactors(CifDocument::parse(text)?)),
        FileType::Xml => Ok(PdbFileResult::Xml(XmlNode::parse(text)?)),
    }
}

fn download_dir(options: &PdbFileOptions) -> Result<Utf8PathBuf, RcsbError> {
    match &options.path {
        Some(path) => Ok(path.clone()),
        None => fs_util::utf8_path(&std::env::temp_dir()),
    }
}

fn saved_file_name(pdb_id: &str, filetype: FileType, compressed: bool) -> String {
    let mut name = format!("{pdb_id}{}", filetype.suffix());
    if compressed {
        name.push_str(".gz");
    }
    name
}

impl<T: Transport> RcsbClient<T> {
    pub fn get_pdb_file(
        &self,
        pdb_id: &str,
        options: &PdbFileOptions,
    ) -> Result<PdbFileResult, RcsbError> {
        let pdb_id = pdb_id.trim();
        if pdb_id.is_empty() {
            return Err(RcsbError::InvalidInput("PDB id is empty".to_string()));
        }

        let mut warnings = Vec::new();
        if options.filetype == FileType::Cif && !options.compression {
            record_warning(
                &mut warnings,
                "mmCIF files download much faster with compression enabled".to_string(),
            );
        }

        let url = self
            .endpoints()
            .download_url(pdb_id, options.filetype, options.compression);
        debug!(%url, "downloading structure file");
        let response = self.get_checked(&url)?;

        let dir = download_dir(options)?;
        let temp = fs_util::write_temp(&dir, &response.body)?;
        let (mut result, saved_path) = if options.save {
            let dest = dir.join(saved_file_name(pdb_id, options.filetype, options.compression));
            let saved = fs_util::persist(temp, &dest)?;
            (read_and_parse(&saved, options)?, Some(saved))
        } else {
            let path = fs_util::utf8_path(temp.path())?;
            let parsed = read_and_parse(&path, options);
            drop(temp);
            (parsed?, None)
        };

        if let PdbFileResult::Coordinates(structure) = &mut result {
            warnings.append(&mut structure.warnings);
            structure.warnings = warnings;
            structure.saved_path = saved_path;
        }
        Ok(result)
    }
}

fn read_and_parse(path: &Utf8Path, options: &PdbFileOptions) -> Result<PdbFileResult, RcsbError> {
    let text = fs_util::read_text(path, options.compression)?;
    parse_download(&text, options.filetype, options)
}
