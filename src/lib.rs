pub mod cif;
pub mod client;
pub mod config;
pub mod error;
pub mod fasta;
pub mod fetch;
pub mod files;
pub mod fs_util;
pub mod http;
pub mod json_util;
pub mod output;
pub mod rest;
pub mod search;
pub mod structure;
pub mod table;
pub mod xml;

pub use client::RcsbClient;
pub use error::{ErrorKind, RcsbError};
pub use fetch::{DataType, FetchResponse, FetcherOutput, PropertyRequest, add_property, generate_json_query};
pub use files::{FileType, PdbFileOptions, PdbFileResult, PdbStructure};
pub use http::{HttpResponse, ReqwestTransport, Transport};
pub use table::{FlatTable, return_data_as_dataframe};
