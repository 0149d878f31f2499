//! Two-phase obfuscation run.
//!
//! Phase one rewrites the schema and harvests every query file into one
//! shared `NameMapper`. Phase two substitutes the finished mapping into the
//! raw query text. Outputs are staged throughout and committed only after
//! both phases succeed.

use std::path::{Path, PathBuf};

use crate::config::ObfuscationConfig;
use crate::error::{Result, SqlMaskError};
use crate::graph::DependencyGraph;
use crate::harvest::QueryHarvester;
use crate::mapper::NameMapper;
use crate::models::{ObfuscationReport, RunSummary};
use crate::output::StagedOutputs;
use crate::parser::parse_statements;
use crate::schema::{RewrittenStatement, SchemaRewriter};
use crate::substitute::TextSubstitutor;
use crate::verify::SchemaShape;

/// Input and output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub schema_input: PathBuf,
    pub schema_output: PathBuf,
    pub query_dir: PathBuf,
    pub query_output: PathBuf,
    /// Optional JSON mapping report
    pub mapping_output: Option<PathBuf>,
}

/// Owns the mapping for one run and drives every component with it.
#[derive(Debug)]
pub struct Obfuscator {
    config: ObfuscationConfig,
    mapper: NameMapper,
    table_order: Vec<String>,
    summary: RunSummary,
}

impl Obfuscator {
    /// Validates `config` and creates an empty run.
    pub fn new(config: ObfuscationConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SqlMaskError::configuration(e.to_string()))?;

        Ok(Self {
            mapper: NameMapper::new(&config),
            config,
            table_order: Vec::new(),
            summary: RunSummary::default(),
        })
    }

    pub fn config(&self) -> &ObfuscationConfig {
        &self.config
    }

    pub fn mapper(&self) -> &NameMapper {
        &self.mapper
    }

    /// Rewrites a schema buffer and renders it in dependency order.
    ///
    /// `context` names the input in error messages.
    pub fn obfuscate_schema(&mut self, text: &str, context: &str) -> Result<String> {
        let statements = parse_statements(text, self.config.dialect, context)?;
        tracing::info!(statements = statements.len(), "Rewriting schema");

        let mut graph = DependencyGraph::new();
        let mut rewriter = SchemaRewriter::new(&mut self.mapper);
        for statement in statements {
            match rewriter.rewrite(statement)? {
                RewrittenStatement::Table(definition) => graph.insert(*definition)?,
                RewrittenStatement::Index { table, statement } => {
                    graph.attach_index(&table, statement)?;
                }
            }
        }

        let rendered = graph.render()?;
        self.table_order = graph.table_order()?;
        self.summary.tables = graph.len();

        if self.config.verify_shape {
            let expected = SchemaShape::from_sql(text, self.config.dialect, context)?;
            let actual =
                SchemaShape::from_sql(&rendered, self.config.dialect, "rendered schema")?;
            expected.ensure_matches(&actual)?;
            tracing::debug!(tables = expected.tables.len(), "Schema shape verified");
        }

        self.refresh_counts();
        Ok(rendered)
    }

    /// Harvests one query buffer into the mapping. Returns the number of
    /// statements seen.
    pub fn harvest_queries(&mut self, text: &str, context: &str) -> Result<usize> {
        let statements = parse_statements(text, self.config.dialect, context)?;

        let mut harvester = QueryHarvester::new(&mut self.mapper, &self.config);
        for statement in &statements {
            harvester.harvest(statement)?;
        }

        tracing::debug!(file = context, statements = statements.len(), "Harvested queries");
        self.summary.query_files = self.summary.query_files.saturating_add(1);
        self.summary.query_statements = self.summary.query_statements.saturating_add(statements.len());
        self.refresh_counts();
        Ok(statements.len())
    }

    /// Applies the mapping to every query buffer and concatenates the
    /// results in the order given.
    ///
    /// The substitutor is built from the mapping as it stands now; names a
    /// later `harvest_queries` call registers are not applied. Harvest every
    /// buffer first, as `run` does.
    pub fn substitute_queries<'t, I>(&self, texts: I) -> Result<String>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let substitutor = TextSubstitutor::new(&self.mapper.replacements())?;
        tracing::info!(replacements = substitutor.len(), "Substituting query text");

        Ok(texts
            .into_iter()
            .map(|text| substitutor.apply(text))
            .collect())
    }

    /// Runs both phases over the files in `paths` and writes every output.
    ///
    /// Nothing is written unless the whole run succeeds.
    pub fn run(&mut self, paths: &RunPaths) -> Result<RunSummary> {
        let schema_context = paths.schema_input.display().to_string();
        let schema_text = read_text(&paths.schema_input)?;
        let query_files = list_query_files(&paths.query_dir)?;

        let mut query_texts = Vec::with_capacity(query_files.len());
        for path in &query_files {
            query_texts.push((path.display().to_string(), read_text(path)?));
        }

        let schema_output = self.obfuscate_schema(&schema_text, &schema_context)?;
        for (context, text) in &query_texts {
            self.harvest_queries(text, context)?;
        }
        let query_output =
            self.substitute_queries(query_texts.iter().map(|(_, text)| text.as_str()))?;

        let mut outputs = StagedOutputs::new();
        outputs.stage(&paths.schema_output, &schema_output)?;
        outputs.stage(&paths.query_output, &query_output)?;
        if let Some(mapping_output) = &paths.mapping_output {
            let report = serde_json::to_string_pretty(&self.report())
                .map_err(|e| SqlMaskError::serialization("Failed to encode mapping report", e))?;
            outputs.stage(mapping_output, &report)?;
        }
        outputs.commit()?;

        let summary = self.summary();
        tracing::info!(
            tables = summary.tables,
            query_files = summary.query_files,
            obfuscated = summary.obfuscated_identifiers,
            "Obfuscation complete"
        );
        Ok(summary)
    }

    /// Counters for the run so far.
    pub fn summary(&self) -> RunSummary {
        self.summary.clone()
    }

    /// Builds the mapping report for the run so far.
    pub fn report(&self) -> ObfuscationReport {
        ObfuscationReport::new(
            self.config.clone(),
            self.table_order.clone(),
            self.summary(),
            self.mapper.entries().cloned().collect(),
        )
    }

    fn refresh_counts(&mut self) {
        let exempt = self.mapper.exempt_count();
        self.summary.exempt_identifiers = exempt;
        self.summary.obfuscated_identifiers = self.mapper.len().saturating_sub(exempt);
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SqlMaskError::io(format!("Failed to read {}", path.display()), e))
}

/// Regular files directly inside `dir`, sorted by file name.
fn list_query_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SqlMaskError::io(format!("Failed to read directory {}", dir.display()), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            SqlMaskError::io(format!("Failed to read directory {}", dir.display()), e)
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "Skipping non-file entry");
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
