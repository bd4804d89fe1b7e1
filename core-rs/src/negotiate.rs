//! Response content negotiation
//!
//! The Accept header is parsed into a weight-sorted list of media ranges and
//! matched against one ordered table of `(media type, serializer)` rows.
//! Supporting another format is a table edit.

use oxigraph::io::RdfFormat;
use oxigraph::sparql::results::QueryResultsFormat;
use std::cmp::Ordering;
use std::fmt;

use crate::errors::{EndpointError, Result};

/// Shape of a query result, known before execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultShape {
    /// SELECT bindings
    Tabular,
    /// ASK
    Boolean,
    /// CONSTRUCT / DESCRIBE
    Graph,
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultShape::Tabular => write!(f, "tabular"),
            ResultShape::Boolean => write!(f, "boolean"),
            ResultShape::Graph => write!(f, "graph"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Serializer {
    Json,
    Xml,
    Csv,
    Tsv,
    Turtle,
    NTriples,
}

impl Serializer {
    pub const ALL: [Serializer; 6] = [
        Serializer::Json,
        Serializer::Xml,
        Serializer::Csv,
        Serializer::Tsv,
        Serializer::Turtle,
        Serializer::NTriples,
    ];

    /// Whether this serializer can encode results of the given shape
    pub fn supports(self, shape: ResultShape) -> bool {
        match shape {
            ResultShape::Tabular | ResultShape::Boolean => self.results_format().is_some(),
            ResultShape::Graph => self.rdf_format().is_some(),
        }
    }

    /// SPARQL results codec for tabular and boolean results
    pub fn results_format(self) -> Option<QueryResultsFormat> {
        match self {
            Serializer::Json => Some(QueryResultsFormat::Json),
            Serializer::Xml => Some(QueryResultsFormat::Xml),
            Serializer::Csv => Some(QueryResultsFormat::Csv),
            Serializer::Tsv => Some(QueryResultsFormat::Tsv),
            Serializer::Turtle | Serializer::NTriples => None,
        }
    }

    /// RDF codec for graph results
    pub fn rdf_format(self) -> Option<RdfFormat> {
        match self {
            Serializer::Xml => Some(RdfFormat::RdfXml),
            Serializer::Turtle => Some(RdfFormat::Turtle),
            Serializer::NTriples => Some(RdfFormat::NTriples),
            Serializer::Json | Serializer::Csv | Serializer::Tsv => None,
        }
    }

    /// W3C format IRIs (`http://www.w3.org/ns/formats/`) this serializer produces
    pub fn format_iris(self) -> &'static [&'static str] {
        match self {
            Serializer::Json => &["http://www.w3.org/ns/formats/SPARQL_Results_JSON"],
            Serializer::Xml => &[
                "http://www.w3.org/ns/formats/SPARQL_Results_XML",
                "http://www.w3.org/ns/formats/RDF_XML",
            ],
            Serializer::Csv => &["http://www.w3.org/ns/formats/SPARQL_Results_CSV"],
            Serializer::Tsv => &["http://www.w3.org/ns/formats/SPARQL_Results_TSV"],
            Serializer::Turtle => &["http://www.w3.org/ns/formats/Turtle"],
            Serializer::NTriples => &["http://www.w3.org/ns/formats/N-Triples"],
        }
    }
}

/// Media types understood by the negotiator, in preference order
pub const FORMATS: &[(&str, Serializer)] = &[
    ("application/sparql-results+json", Serializer::Json),
    ("application/json", Serializer::Json),
    ("text/json", Serializer::Json),
    ("application/sparql-results+xml", Serializer::Xml),
    ("application/xml", Serializer::Xml),
    ("text/xml", Serializer::Xml),
    ("application/rdf+xml", Serializer::Xml),
    ("application/sparql-results+csv", Serializer::Csv),
    ("text/csv", Serializer::Csv),
    ("application/sparql-results+tsv", Serializer::Tsv),
    ("text/tab-separated-values", Serializer::Tsv),
    ("text/turtle", Serializer::Turtle),
    ("application/x-turtle", Serializer::Turtle),
    ("application/n-triples", Serializer::NTriples),
];

pub const DEFAULT_RESULTS_MIME: &str = "application/sparql-results+xml";
pub const DEFAULT_GRAPH_MIME: &str = "application/rdf+xml";
const TURTLE_MIME: &str = "text/turtle";
const HTML_MIME: &str = "text/html";

/// One entry of an Accept header
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub media_type: String,
    pub weight: f32,
}

impl MediaRange {
    fn is_any(&self) -> bool {
        self.media_type == "*/*"
    }

    /// Top-level type of a `type/*` range
    fn type_wildcard(&self) -> Option<&str> {
        self.media_type.strip_suffix("/*")
    }
}

/// Parse an Accept header into ranges sorted by weight.
///
/// Equal weights keep their declaration order. Entries with `q=0` are
/// dropped; unparsable weights count as 1.
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let media_type = parts.next()?.trim().to_ascii_lowercase();
            if !media_type.contains('/') {
                return None;
            }

            let mut weight = 1.0_f32;
            for param in parts {
                if let Some((key, value)) = param.split_once('=') {
                    if key.trim().eq_ignore_ascii_case("q") {
                        weight = value
                            .trim()
                            .parse::<f32>()
                            .ok()
                            .filter(|w| w.is_finite())
                            .map(|w| w.clamp(0.0, 1.0))
                            .unwrap_or(1.0);
                    }
                }
            }

            if weight <= 0.0 {
                return None;
            }
            Some(MediaRange { media_type, weight })
        })
        .collect();

    // sort_by is stable
    ranges.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    ranges
}

/// Format chosen for a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub mime_type: String,
    pub serializer: Serializer,
}

impl NegotiatedFormat {
    fn new(mime_type: &str, serializer: Serializer) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            serializer,
        }
    }

    /// Default when the client expresses no usable preference
    pub fn default_for(shape: ResultShape) -> Self {
        match shape {
            ResultShape::Graph => Self::new(DEFAULT_GRAPH_MIME, Serializer::Xml),
            ResultShape::Tabular | ResultShape::Boolean => Self::new(DEFAULT_RESULTS_MIME, Serializer::Xml),
        }
    }

    /// Content-Type header value
    pub fn content_type(&self) -> String {
        match self.serializer {
            Serializer::Json | Serializer::Xml | Serializer::Turtle => {
                format!("{}; charset=utf-8", self.mime_type)
            }
            _ => self.mime_type.clone(),
        }
    }
}

fn lookup(media_type: &str) -> Option<Serializer> {
    FORMATS
        .iter()
        .find(|(mime, _)| *mime == media_type)
        .map(|(_, serializer)| *serializer)
}

/// Legacy aliases answered only when named explicitly, never for `type/*`
const WILDCARD_EXCLUDED: &[&str] = &["text/json", "text/xml", "application/x-turtle"];

/// Pick the response format for a query result of the given shape.
///
/// Graph results asked for only as JSON, CSV or TSV fall back to Turtle; a
/// graph format the client accepts at a lower weight is preferred over the
/// fallback. A tabular or boolean result whose best match is an RDF-only
/// format (Turtle, N-Triples) cannot be encoded and is rejected.
pub fn negotiate_results(accept: Option<&str>, shape: ResultShape) -> Result<NegotiatedFormat> {
    let ranges = parse_accept(accept.unwrap_or_default());
    let mut turtle_fallback = false;

    for range in &ranges {
        if range.is_any() {
            return Ok(NegotiatedFormat::default_for(shape));
        }

        if let Some(top_level) = range.type_wildcard() {
            let candidate = FORMATS
                .iter()
                .filter(|(mime, serializer)| !WILDCARD_EXCLUDED.contains(mime) && serializer.supports(shape))
                .map(|(mime, serializer)| answer(mime, *serializer, shape))
                .find(|format| format.mime_type.split('/').next() == Some(top_level));
            if let Some(format) = candidate {
                return Ok(format);
            }
            continue;
        }

        let Some(serializer) = lookup(&range.media_type) else {
            continue;
        };

        if serializer.supports(shape) {
            return Ok(answer(&range.media_type, serializer, shape));
        }

        match shape {
            ResultShape::Graph => turtle_fallback = true,
            ResultShape::Tabular | ResultShape::Boolean => {
                return Err(EndpointError::unprocessable(format!(
                    "Cannot serialize {} results as {}",
                    shape, range.media_type
                )))
            }
        }
    }

    if turtle_fallback {
        return Ok(NegotiatedFormat::new(TURTLE_MIME, Serializer::Turtle));
    }
    Ok(NegotiatedFormat::default_for(shape))
}

/// Representation of the response to a request without an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    /// Interactive query editor
    Html,
    Turtle,
    RdfXml,
}

impl DescriptionFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            DescriptionFormat::Html => "text/html; charset=utf-8",
            DescriptionFormat::Turtle => "text/turtle; charset=utf-8",
            DescriptionFormat::RdfXml => "application/rdf+xml; charset=utf-8",
        }
    }
}

/// Browsers get the query UI when it is enabled; `text/turtle` gets Turtle;
/// everything else gets RDF/XML.
pub fn negotiate_description(accept: Option<&str>, ui_enabled: bool) -> DescriptionFormat {
    let ranges = parse_accept(accept.unwrap_or_default());

    match ranges.first().map(|range| range.media_type.as_str()) {
        Some(HTML_MIME) if ui_enabled => DescriptionFormat::Html,
        Some(TURTLE_MIME) | Some("application/x-turtle") => DescriptionFormat::Turtle,
        _ => DescriptionFormat::RdfXml,
    }
}

/// Format IRIs advertised in the service description, derived from [`FORMATS`]
pub fn advertised_format_iris() -> Vec<&'static str> {
    let mut iris = Vec::new();
    for serializer in Serializer::ALL {
        if !FORMATS.iter().any(|(_, s)| *s == serializer) {
            continue;
        }
        for iri in serializer.format_iris() {
            if !iris.contains(iri) {
                iris.push(*iri);
            }
        }
    }
    iris
}
