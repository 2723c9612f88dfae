//! Static lookup tables for the supported schemes and formats.
//!
//! This module provides:
//! - `SchemeKind`: the transport schemes a loader exists for
//! - `FormatKind`: the encoded formats a parser exists for
//! - the option names each variant declares, used to reject unclaimed options
//! - `is_supported`: pure lookup used by `Stream::test`

/// Scheme used when none is detected.
pub const DEFAULT_SCHEME: SchemeKind = SchemeKind::File;

/// Transport schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeKind {
    /// Local filesystem
    File,
    Http,
    Https,
    Ftp,
    Ftps,
    /// In-process record sequence, no bytes involved
    Native,
    /// Already-open byte handle or in-memory bytes
    Stream,
    /// Inline text literal
    Text,
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeKind::File => write!(f, "file"),
            SchemeKind::Http => write!(f, "http"),
            SchemeKind::Https => write!(f, "https"),
            SchemeKind::Ftp => write!(f, "ftp"),
            SchemeKind::Ftps => write!(f, "ftps"),
            SchemeKind::Native => write!(f, "native"),
            SchemeKind::Stream => write!(f, "stream"),
            SchemeKind::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for SchemeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(SchemeKind::File),
            "http" => Ok(SchemeKind::Http),
            "https" => Ok(SchemeKind::Https),
            "ftp" => Ok(SchemeKind::Ftp),
            "ftps" => Ok(SchemeKind::Ftps),
            "native" => Ok(SchemeKind::Native),
            "stream" => Ok(SchemeKind::Stream),
            "text" => Ok(SchemeKind::Text),
            _ => Err(()),
        }
    }
}

impl SchemeKind {
    /// Whether this scheme goes through the remote loader.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SchemeKind::Http | SchemeKind::Https | SchemeKind::Ftp | SchemeKind::Ftps
        )
    }

    /// Check if a loader for this scheme is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            #[cfg(feature = "remote")]
            SchemeKind::Http | SchemeKind::Https | SchemeKind::Ftp | SchemeKind::Ftps => true,
            #[cfg(not(feature = "remote"))]
            SchemeKind::Http | SchemeKind::Https | SchemeKind::Ftp | SchemeKind::Ftps => false,

            SchemeKind::File | SchemeKind::Native | SchemeKind::Stream | SchemeKind::Text => true,
        }
    }

    /// Option names claimed by the loader for this scheme.
    pub fn options(&self) -> &'static [&'static str] {
        if self.is_remote() {
            &["http_timeout", "http_stream"]
        } else {
            &[]
        }
    }
}

/// Encoded formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Comma (or sniffed) delimited text
    Csv,
    /// Tab separated values with backslash escapes
    Tsv,
    /// A JSON document holding an array of rows
    Json,
    /// One JSON value per line
    Ndjson,
    /// Legacy spreadsheet binary
    Xls,
    /// Modern spreadsheet XML-zip
    Xlsx,
    /// OpenDocument spreadsheet
    Ods,
    /// Tables in HTML/XHTML markup
    Html,
    /// Google Sheets link, read through its CSV export
    Gsheet,
    /// In-process record sequence
    Native,
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::Csv => write!(f, "csv"),
            FormatKind::Tsv => write!(f, "tsv"),
            FormatKind::Json => write!(f, "json"),
            FormatKind::Ndjson => write!(f, "ndjson"),
            FormatKind::Xls => write!(f, "xls"),
            FormatKind::Xlsx => write!(f, "xlsx"),
            FormatKind::Ods => write!(f, "ods"),
            FormatKind::Html => write!(f, "html"),
            FormatKind::Gsheet => write!(f, "gsheet"),
            FormatKind::Native => write!(f, "native"),
        }
    }
}

impl std::str::FromStr for FormatKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Ok(FormatKind::Csv),
            "tsv" | "tab" => Ok(FormatKind::Tsv),
            "json" => Ok(FormatKind::Json),
            "ndjson" | "jsonl" => Ok(FormatKind::Ndjson),
            "xls" => Ok(FormatKind::Xls),
            "xlsx" | "xlsm" => Ok(FormatKind::Xlsx),
            "ods" => Ok(FormatKind::Ods),
            "html" | "htm" | "xhtml" => Ok(FormatKind::Html),
            "gsheet" => Ok(FormatKind::Gsheet),
            "native" => Ok(FormatKind::Native),
            _ => Err(()),
        }
    }
}

impl FormatKind {
    /// File extensions that classify as this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FormatKind::Csv => &["csv", "txt"],
            FormatKind::Tsv => &["tsv", "tab"],
            FormatKind::Json => &["json"],
            FormatKind::Ndjson => &["ndjson", "jsonl"],
            FormatKind::Xls => &["xls"],
            FormatKind::Xlsx => &["xlsx", "xlsm"],
            FormatKind::Ods => &["ods"],
            FormatKind::Html => &["html", "htm", "xhtml"],
            FormatKind::Gsheet | FormatKind::Native => &[],
        }
    }

    /// Check if a parser for this format is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            #[cfg(feature = "csv")]
            FormatKind::Csv | FormatKind::Tsv => true,
            #[cfg(not(feature = "csv"))]
            FormatKind::Csv | FormatKind::Tsv => false,

            #[cfg(all(feature = "csv", feature = "remote"))]
            FormatKind::Gsheet => true,
            #[cfg(not(all(feature = "csv", feature = "remote")))]
            FormatKind::Gsheet => false,

            #[cfg(feature = "spreadsheet")]
            FormatKind::Xls | FormatKind::Xlsx | FormatKind::Ods => true,
            #[cfg(not(feature = "spreadsheet"))]
            FormatKind::Xls | FormatKind::Xlsx | FormatKind::Ods => false,

            #[cfg(feature = "html")]
            FormatKind::Html => true,
            #[cfg(not(feature = "html"))]
            FormatKind::Html => false,

            FormatKind::Json | FormatKind::Ndjson | FormatKind::Native => true,
        }
    }

    /// Option names claimed by the parser for this format.
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            FormatKind::Csv | FormatKind::Gsheet => &[
                "delimiter",
                "quote_char",
                "escape_char",
                "double_quote",
                "skip_initial_space",
            ],
            FormatKind::Tsv | FormatKind::Ndjson | FormatKind::Native => &[],
            FormatKind::Json => &["prefix"],
            FormatKind::Xls | FormatKind::Xlsx => &["sheet", "fill_merged_cells"],
            FormatKind::Ods => &["sheet"],
            FormatKind::Html => &["table"],
        }
    }

    /// Whether the parser reads bytes in text mode.
    pub fn is_text(&self) -> bool {
        !matches!(
            self,
            FormatKind::Xls | FormatKind::Xlsx | FormatKind::Ods | FormatKind::Native
        )
    }

    /// Look up the format for a file extension.
    pub fn for_extension(ext: &str) -> Option<FormatKind> {
        let ext = ext.to_ascii_lowercase();
        ALL_FORMATS
            .iter()
            .copied()
            .find(|kind| kind.extensions().iter().any(|e| *e == ext))
    }
}

const ALL_FORMATS: &[FormatKind] = &[
    FormatKind::Csv,
    FormatKind::Tsv,
    FormatKind::Json,
    FormatKind::Ndjson,
    FormatKind::Xls,
    FormatKind::Xlsx,
    FormatKind::Ods,
    FormatKind::Html,
    FormatKind::Gsheet,
    FormatKind::Native,
];

/// Whether a scheme can carry a format.
///
/// Native records never travel as bytes, and byte formats never come from
/// an in-process sequence.
pub fn compatible(scheme: SchemeKind, format: FormatKind) -> bool {
    match (scheme, format) {
        (SchemeKind::Native, FormatKind::Native) => true,
        (SchemeKind::Native, _) | (_, FormatKind::Native) => false,
        (SchemeKind::Http | SchemeKind::Https, FormatKind::Gsheet) => true,
        (_, FormatKind::Gsheet) => false,
        _ => true,
    }
}

/// Pure lookup: both names resolve, are compiled in, and fit together.
pub fn is_supported(scheme: &str, format: &str) -> bool {
    let (Ok(scheme), Ok(format)) = (scheme.parse::<SchemeKind>(), format.parse::<FormatKind>())
    else {
        return false;
    };
    scheme.is_available() && format.is_available() && compatible(scheme, format)
}
