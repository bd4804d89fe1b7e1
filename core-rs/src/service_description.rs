/**
 * service_description.rs
 * SPARQL 1.1 Service Description generation
 *
 * Generated graph:
 * ```turtle
 * <endpoint> a sd:Service ;
 *     rdfs:label "title" ;
 *     dc:description "description" ;
 *     sd:endpoint <endpoint> ;
 *     sd:supportedLanguage sd:SPARQL11Query ;
 *     sd:resultFormat formats:SPARQL_Results_JSON, ... ;
 *     sd:feature sd:DereferencesURIs ;
 *     sd:defaultEntailmentRegime ent:RDFS ;
 *     sd:defaultDataset [ a sd:Dataset ; sd:defaultGraph [ a sd:Graph ] ] ;
 *     sd:extensionFunction <fn> .
 * <fn> a sd:Function .
 * ```
 *
 * The `sd:extensionFunction` objects are read from the registry and the
 * `sd:resultFormat` objects from the negotiation table, so the document never
 * advertises a function or a format the endpoint cannot serve.
 */

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{BlankNode, Graph, Literal, NamedNode, NamedNodeRef, TripleRef};

use crate::config::EndpointConfig;
use crate::errors::{EndpointError, Result};
use crate::negotiate::advertised_format_iris;
use crate::registry::ExtensionRegistry;

pub mod sd {
    use oxigraph::model::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/ns/sparql-service-description#";

    pub const SERVICE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#Service");
    pub const ENDPOINT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#endpoint");
    pub const SUPPORTED_LANGUAGE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#supportedLanguage");
    pub const SPARQL11_QUERY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#SPARQL11Query");
    pub const SPARQL11_UPDATE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#SPARQL11Update");
    pub const RESULT_FORMAT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#resultFormat");
    pub const FEATURE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#feature");
    pub const DEREFERENCES_URIS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#DereferencesURIs");
    pub const DEFAULT_ENTAILMENT_REGIME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#defaultEntailmentRegime");
    pub const DEFAULT_DATASET: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#defaultDataset");
    pub const DATASET: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#Dataset");
    pub const DEFAULT_GRAPH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#defaultGraph");
    pub const GRAPH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#Graph");
    pub const EXTENSION_FUNCTION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#extensionFunction");
    pub const FUNCTION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#Function");
}

const ENT_RDFS: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("http://www.w3.org/ns/entailment/RDFS");
const RDFS_LABEL: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
const DC_DESCRIPTION: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/elements/1.1/description");

const PREFIXES: &[(&str, &str)] = &[
    ("sd", sd::NAMESPACE),
    ("ent", "http://www.w3.org/ns/entailment/"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("formats", "http://www.w3.org/ns/formats/"),
];

/// Static facts about the endpoint that end up in the description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionInfo {
    pub public_url: String,
    pub title: String,
    pub description: String,
    pub update_enabled: bool,
}

impl From<&EndpointConfig> for DescriptionInfo {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            public_url: config.public_url.clone(),
            title: config.title.clone(),
            description: config.description.clone(),
            update_enabled: config.enable_update,
        }
    }
}

/// A generated service description graph
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    service: NamedNode,
    graph: Graph,
    extension_functions: Vec<NamedNode>,
}

impl ServiceDescription {
    pub fn generate(info: &DescriptionInfo, registry: &ExtensionRegistry) -> Result<Self> {
        let service = NamedNode::new(info.public_url.as_str())
            .map_err(|e| EndpointError::InvalidIri(format!("{}: {}", info.public_url, e)))?;
        let mut graph = Graph::new();

        let label = Literal::new_simple_literal(info.title.as_str());
        let description = Literal::new_simple_literal(info.description.replace(['\n', '\r'], " "));

        graph.insert(TripleRef::new(&service, rdf::TYPE, sd::SERVICE));
        graph.insert(TripleRef::new(&service, RDFS_LABEL, &label));
        graph.insert(TripleRef::new(&service, DC_DESCRIPTION, &description));
        graph.insert(TripleRef::new(&service, sd::ENDPOINT, &service));
        graph.insert(TripleRef::new(&service, sd::SUPPORTED_LANGUAGE, sd::SPARQL11_QUERY));
        if info.update_enabled {
            graph.insert(TripleRef::new(&service, sd::SUPPORTED_LANGUAGE, sd::SPARQL11_UPDATE));
        }

        for iri in advertised_format_iris() {
            graph.insert(TripleRef::new(&service, sd::RESULT_FORMAT, NamedNodeRef::new_unchecked(iri)));
        }

        graph.insert(TripleRef::new(&service, sd::FEATURE, sd::DEREFERENCES_URIS));
        graph.insert(TripleRef::new(&service, sd::DEFAULT_ENTAILMENT_REGIME, ENT_RDFS));

        let dataset = BlankNode::default();
        let default_graph = BlankNode::default();
        graph.insert(TripleRef::new(&service, sd::DEFAULT_DATASET, &dataset));
        graph.insert(TripleRef::new(&dataset, rdf::TYPE, sd::DATASET));
        graph.insert(TripleRef::new(&dataset, sd::DEFAULT_GRAPH, &default_graph));
        graph.insert(TripleRef::new(&default_graph, rdf::TYPE, sd::GRAPH));

        let extension_functions: Vec<NamedNode> = registry.iris().cloned().collect();
        for function in &extension_functions {
            graph.insert(TripleRef::new(&service, sd::EXTENSION_FUNCTION, function));
            graph.insert(TripleRef::new(function, rdf::TYPE, sd::FUNCTION));
        }

        tracing::debug!(
            service = service.as_str(),
            triples = graph.len(),
            extension_functions = extension_functions.len(),
            "generated service description"
        );

        Ok(Self {
            service,
            graph,
            extension_functions,
        })
    }

    /// The `sd:Service` resource
    pub fn service(&self) -> &NamedNode {
        &self.service
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// IRIs advertised as `sd:extensionFunction`, in registry order
    pub fn extension_functions(&self) -> &[NamedNode] {
        &self.extension_functions
    }

    pub fn to_turtle(&self) -> Result<Vec<u8>> {
        self.serialize(RdfFormat::Turtle)
    }

    pub fn to_rdf_xml(&self) -> Result<Vec<u8>> {
        self.serialize(RdfFormat::RdfXml)
    }

    pub fn serialize(&self, format: RdfFormat) -> Result<Vec<u8>> {
        let mut serializer = RdfSerializer::from_format(format);
        for (name, iri) in PREFIXES {
            serializer = serializer
                .with_prefix(*name, *iri)
                .map_err(|e| EndpointError::internal(format!("Invalid prefix {}: {}", name, e)))?;
        }

        let mut writer = serializer.for_writer(Vec::new());
        for triple in self.graph.iter() {
            writer.serialize_triple(triple)?;
        }
        Ok(writer.finish()?)
    }
}
