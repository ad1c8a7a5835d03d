//! The fixed KITopen field catalog.
//!
//! `Field` enumerates every column the export can produce. `Catalog` maps each
//! field to the header name it carries in the exported CSV.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

// ─────────────────────────────────────────────────────────────────────────────
// FieldKind
// ─────────────────────────────────────────────────────────────────────────────

/// How the raw cell text of a field is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    /// Yes/no columns.
    Flag,
}

// ─────────────────────────────────────────────────────────────────────────────
// Field
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! fields {
    ($($variant:ident => $ident:literal : $kind:ident),+ $(,)?) => {
        /// A field identifier from the export catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Field {
            $($variant),+
        }

        impl Field {
            /// Every field, in catalog order.
            pub const ALL: &'static [Field] = &[$(Field::$variant),+];

            /// The identifier used in views and in the `table_fields` parameter.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Field::$variant => $ident),+
                }
            }

            pub fn kind(self) -> FieldKind {
                match self {
                    $(Field::$variant => FieldKind::$kind),+
                }
            }
        }

        impl FromStr for Field {
            type Err = SearchError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($ident => Ok(Field::$variant),)+
                    other => Err(SearchError::InvalidView(format!(
                        "unknown field '{}'",
                        other
                    ))),
                }
            }
        }
    };
}

fields! {
    Doi => "doi": Text,
    PublicationType => "publication_type": Text,
    Year => "year": Integer,
    DateOnline => "date_online": Text,
    Isbn => "isbn": Text,
    Issn => "issn": Text,
    Title => "title": Text,
    Author => "author": Text,
    Collaborations => "collaborations": Text,
    Volume => "volume": Text,
    Issue => "issue": Text,
    Pages => "pages": Text,
    Source => "source": Text,
    Series => "series": Text,
    SeriesNumber => "series_number": Text,
    Publisher => "publisher": Text,
    Edition => "edition": Text,
    ThesisType => "thesis_type": Text,
    Advisor => "advisor": Text,
    Event => "event": Text,
    BibliographicData => "bibliographic_data": Text,
    Id => "id": Text,
    CnId => "cn_id": Text,
    WosId => "wos_id": Text,
    ScopusId => "scopus_id": Text,
    PofStructure => "pof_structure": Text,
    AdditionalPofStructures => "additional_pof_structures": Text,
    InWos => "in_wos": Flag,
    InScopus => "in_scopus": Flag,
    InWosOrScopus => "in_wos_or_scopus": Flag,
    InDoaj => "in_doaj": Flag,
    IsReferenced => "is_referenced": Flag,
    IsOtherwiseReferenced => "is_otherwise_referenced": Flag,
    RemarksReviewProcess => "remarks_review_process": Text,
    IsOpenAccess => "is_open_access": Flag,
    WithFullText => "with_full_text": Flag,
    IsInvited => "is_invited": Flag,
    VerificationTasks => "verification_tasks": Text,
    Languages => "languages": Text,
    OrganizationNames => "organization_names": Text,
    OrganizationAcronyms => "organization_acronyms": Text,
    InstituteSpecification => "institute_specification": Text,
    PspElementsGfb => "psp_elements_gfb": Text,
    PspElementsUb => "psp_elements_ub": Text,
    ProjectAcronym => "project_acronym": Text,
    ProjectFunder => "project_funder": Text,
    ProjectFundingId => "project_funding_id": Text,
    ProjectFrameworkProgram => "project_framework_program": Text,
    RemarksPublication => "remarks_publication": Text,
    KitTagging => "kit_tagging": Text,
    FullTextType => "full_text_type": Text,
    FullTextState => "full_text_state": Text,
    DoiKitopen => "doi_kitopen": Text,
    License => "license": Text,
    Embargo => "embargo": Text,
    Citations => "citations": Integer,
    CitationsWos => "citations_wos": Integer,
    CitationsScopus => "citations_scopus": Integer,
    ImpactFactor => "impact_factor": Float,
    Downloads => "downloads": Integer,
    PageViews => "page_views": Integer,
    Ddc => "ddc": Text,
    InsertDate => "insert_date": Text,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Maps catalog fields to the CSV header names used by the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Indexed by the field's position in `Field::ALL`.
    columns: Vec<String>,
}

impl Catalog {
    /// The KITopen catalog: every field exported under its own identifier.
    pub fn kitopen() -> Self {
        Self {
            columns: Field::ALL.iter().map(|f| f.as_str().to_string()).collect(),
        }
    }

    /// Overrides the header name expected for `field`.
    pub fn with_column(mut self, field: Field, column: impl Into<String>) -> Self {
        self.columns[field as usize] = column.into();
        self
    }

    /// The header name `field` is exported under.
    pub fn column(&self, field: Field) -> &str {
        &self.columns[field as usize]
    }

    /// Fields with their header names, in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.iter().map(move |&f| (f, self.column(f)))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::kitopen()
    }
}
