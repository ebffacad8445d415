//! Atom tables read from PDB and mmCIF coordinate files.
//!
//! Readers keep the first model only. Blank and placeholder fields (`""`, `?`, `.`)
//! come back as `None`.

use serde::Serialize;

use crate::cif::{CifDocument, CifLoop, CifValue};
use crate::error::RcsbError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomRecord {
    /// `ATOM` or `HETATM`.
    pub record: String,
    pub serial: Option<i64>,
    pub name: Option<String>,
    pub alt_loc: Option<String>,
    pub res_name: Option<String>,
    pub chain_id: Option<String>,
    pub res_seq: Option<i64>,
    pub insertion_code: Option<String>,
    pub occupancy: Option<f64>,
    pub b_factor: Option<f64>,
    pub element: Option<String>,
    pub charge: Option<String>,
}

impl AtomRecord {
    pub fn is_calpha(&self) -> bool {
        self.record == "ATOM" && self.name.as_deref() == Some("CA")
    }
}

/// Atom rows plus the matching coordinate rows, `atoms[i]` at `xyz[i]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AtomTable {
    pub atoms: Vec<AtomRecord>,
    pub xyz: Vec<[f64; 3]>,
    /// Number of models seen in the file; only the first is kept.
    pub model_count: usize,
}

impl AtomTable {
    fn push(&mut self, atom: AtomRecord, coords: [f64; 3]) {
        self.atoms.push(atom);
        self.xyz.push(coords);
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Keeps rows where `keep` is true, in both the atom and coordinate tables.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&AtomRecord) -> bool,
    {
        let mask: Vec<bool> = self.atoms.iter().map(&mut keep).collect();
        let mut index = 0;
        self.atoms.retain(|_| {
            index += 1;
            mask[index - 1]
        });
        let mut index = 0;
        self.xyz.retain(|_| {
            index += 1;
            mask[index - 1]
        });
    }
}

/// Parser seam for coordinate formats.
pub trait StructureReader {
    fn read(&self, text: &str) -> Result<AtomTable, RcsbError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdbReader;

#[derive(Debug, Clone, Copy, Default)]
pub struct MmcifReader;

pub(crate) fn placeholder_to_none(value: &str) -> Option<String> {
    match value.trim() {
        "" | "?" | "." => None,
        other => Some(other.to_string()),
    }
}

fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("")
}

fn parse_coordinate(line: &str, start: usize, end: usize, number: usize) -> Result<f64, RcsbError> {
    column(line, start, end).trim().parse().map_err(|_| {
        RcsbError::StructureParse(format!(
            "line {number}: invalid coordinate '{}'",
            column(line, start, end).trim()
        ))
    })
}

impl StructureReader for PdbReader {
    fn read(&self, text: &str) -> Result<AtomTable, RcsbError> {
        let mut table = AtomTable::default();
        let mut in_first_model = true;

        for (index, line) in text.lines().enumerate() {
            let record = column(line, 0, 6).trim();
            match record {
                "MODEL" => table.model_count += 1,
                "ENDMDL" => in_first_model = false,
                "ATOM" | "HETATM" if in_first_model => {
                    let number = index + 1;
                    let coords = [
                        parse_coordinate(line, 30, 38, number)?,
                        parse_coordinate(line, 38, 46, number)?,
                        parse_coordinate(line, 46, 54, number)?,
                    ];
                    let atom = AtomRecord {
                        record: record.to_string(),
                        serial: column(line, 6, 11).trim().parse().ok(),
                        name: placeholder_to_none(column(line, 12, 16)),
                        alt_loc: placeholder_to_none(column(line, 16, 17)),
                        res_name: placeholder_to_none(column(line, 17, 20)),
                        chain_id: placeholder_to_none(column(line, 21, 22)),
                        res_seq: column(line, 22, 26).trim().parse().ok(),
                        insertion_code: placeholder_to_none(column(line, 26, 27)),
                        occupancy: column(line, 54, 60).trim().parse().ok(),
                        b_factor: column(line, 60, 66).trim().parse().ok(),
                        element: placeholder_to_none(column(line, 76, 78)),
                        charge: placeholder_to_none(column(line, 78, 80)),
                    };
                    table.push(atom, coords);
                }
                _ => {}
            }
        }

        table.model_count = table.model_count.max(1);
        if table.is_empty() {
            return Err(RcsbError::StructureParse(
                "no ATOM or HETATM records found".to_string(),
            ));
        }
        Ok(table)
    }
}

/// Column positions of the `_atom_site` loop. Author fields win over label fields.
#[derive(Default)]
struct AtomSiteIndices {
    group_pdb: Option<usize>,
    id: Option<usize>,
    atom_id: Option<usize>,
    alt_id: Option<usize>,
    comp_id: Option<usize>,
    asym_id: Option<usize>,
    seq_id: Option<usize>,
    ins_code: Option<usize>,
    cartn_x: Option<usize>,
    cartn_y: Option<usize>,
    cartn_z: Option<usize>,
    occupancy: Option<usize>,
    b_iso: Option<usize>,
    type_symbol: Option<usize>,
    formal_charge: Option<usize>,
    model_num: Option<usize>,
}

impl AtomSiteIndices {
    fn from_loop(atom_site: &CifLoop) -> Self {
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| atom_site.column(&format!("_atom_site.{name}")))
        };
        Self {
            group_pdb: find(&["group_PDB"]),
            id: find(&["id"]),
            atom_id: find(&["auth_atom_id", "label_atom_id"]),
            alt_id: find(&["label_alt_id"]),
            comp_id: find(&["auth_comp_id", "label_comp_id"]),
            asym_id: find(&["auth_asym_id", "label_asym_id"]),
            seq_id: find(&["auth_seq_id", "label_seq_id"]),
            ins_code: find(&["pdbx_PDB_ins_code"]),
            cartn_x: find(&["Cartn_x"]),
            cartn_y: find(&["Cartn_y"]),
            cartn_z: find(&["Cartn_z"]),
            occupancy: find(&["occupancy"]),
            b_iso: find(&["B_iso_or_equiv"]),
            type_symbol: find(&["type_symbol"]),
            formal_charge: find(&["pdbx_formal_charge"]),
            model_num: find(&["pdbx_PDB_model_num"]),
        }
    }
}

fn cell<'a>(row: &'a [CifValue], index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|index| row.get(index))
        .and_then(CifValue::as_str)
}

fn text_cell(row: &[CifValue], index: Option<usize>) -> Option<String> {
    cell(row, index).and_then(placeholder_to_none)
}

impl StructureReader for MmcifReader {
    fn read(&self, text: &str) -> Result<AtomTable, RcsbError> {
        let document = CifDocument::parse(text)?;
        let atom_site = document
            .first_block()
            .and_then(|block| block.category("_atom_site"))
            .ok_or_else(|| RcsbError::StructureParse("no _atom_site category".to_string()))?;

        let idx = AtomSiteIndices::from_loop(&atom_site);
        let (Some(x), Some(y), Some(z)) = (idx.cartn_x, idx.cartn_y, idx.cartn_z) else {
            return Err(RcsbError::StructureParse(
                "_atom_site has no Cartn_x/y/z columns".to_string(),
            ));
        };

        let mut table = AtomTable::default();
        let mut models: Vec<&str> = Vec::new();
        for (number, row) in atom_site.rows.iter().enumerate() {
            let model = cell(row, idx.model_num).unwrap_or("1");
            if !models.contains(&model) {
                models.push(model);
            }
            if model != models[0] {
                continue;
            }

            let coordinate = |index: usize| {
                cell(row, Some(index))
                    .and_then(|value| value.parse::<f64>().ok())
                    .ok_or_else(|| {
                        RcsbError::StructureParse(format!(
                            "_atom_site row {}: invalid coordinate",
                            number + 1
                        ))
                    })
            };
            let coords = [coordinate(x)?, coordinate(y)?, coordinate(z)?];
            let atom = AtomRecord {
                record: cell(row, idx.group_pdb).unwrap_or("ATOM").to_string(),
                serial: cell(row, idx.id).and_then(|value| value.parse().ok()),
                name: text_cell(row, idx.atom_id),
                alt_loc: text_cell(row, idx.alt_id),
                res_name: text_cell(row, idx.comp_id),
                chain_id: text_cell(row, idx.asym_id),
                res_seq: cell(row, idx.seq_id).and_then(|value| value.parse().ok()),
                insertion_code: text_cell(row, idx.ins_code),
                occupancy: cell(row, idx.occupancy).and_then(|value| value.parse().ok()),
                b_factor: cell(row, idx.b_iso).and_then(|value| value.parse().ok()),
                element: text_cell(row, idx.type_symbol),
                charge: text_cell(row, idx.formal_charge),
            };
            table.push(atom, coords);
        }

        table.model_count = models.len().max(1);
        if table.is_empty() {
            return Err(RcsbError::StructureParse("_atom_site has no rows".to_string()));
        }
        Ok(table)
    }
}
