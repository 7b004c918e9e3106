//! Contig name to id mapping shared by all inputs.

use std::collections::HashMap;

use rust_htslib::bcf::header::HeaderView;

use crate::cursor::CursorError;

/// Contig names shared by every input, indexed by contig id.
///
/// Ids follow the declaration order of the header the dictionary was built
/// from, so `CallPosition` ordering matches that header's contig order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContigDictionary {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl ContigDictionary {
    /// Dictionary over `names`, in order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = Self::default();
        for name in names {
            dictionary.push(name.into());
        }
        dictionary
    }

    /// Dictionary over the `##contig` lines of a VCF/BCF header.
    pub fn from_header(header: &HeaderView) -> Result<Self, CursorError> {
        let mut dictionary = Self::default();
        for rid in 0..header.contig_count() {
            let name = header.rid2name(rid)?;
            dictionary.push(String::from_utf8_lossy(name).into_owned());
        }
        Ok(dictionary)
    }

    fn push(&mut self, name: String) {
        if self.ids.contains_key(&name) {
            return;
        }
        self.ids.insert(name.clone(), self.names.len() as u32);
        self.names.push(name);
    }

    /// Id of `name`, if declared.
    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Id of `name`, or [`CursorError::UnknownContig`].
    pub fn resolve(&self, name: &str) -> Result<u32, CursorError> {
        self.id(name).ok_or_else(|| CursorError::UnknownContig {
            name: name.to_string(),
        })
    }

    /// Name of contig `id`.
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of contigs.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no contig is declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Contig names in id order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
