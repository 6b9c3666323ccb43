use clap::Parser;
use colored::Colorize;
use cppscout::{
    search_with, Category, CppParser, JsonSink, ResultSink, SearchConfig, SearchError,
    TerminalSink,
};
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

/// Structural search over C and C++ sources
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Literal to look for in declaration names
    query: String,

    /// Files or directories to search
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Only evaluate files whose path matches one of these globs
    #[arg(short = 'f', long = "filter", default_value = "*.*")]
    filters: Vec<String>,

    /// Skip files whose path matches one of these globs
    #[arg(short = 'e', long = "exclude")]
    excludes: Vec<String>,

    /// Require the name to equal the query
    #[arg(short = 'E', long)]
    exact_match: bool,

    /// Do not skip build, docs, VCS and similar directories
    #[arg(long)]
    no_ignore_dirs: bool,

    /// Number of worker threads
    #[arg(short = 'j', long = "jobs")]
    threads: Option<NonZeroUsize>,

    /// Search for enum declarations
    #[arg(long = "enum")]
    enum_decl: bool,

    /// Search for struct declarations
    #[arg(long = "struct")]
    struct_decl: bool,

    /// Search for union declarations
    #[arg(long = "union")]
    union_decl: bool,

    /// Search for member function declarations
    #[arg(long)]
    member_function: bool,

    /// Search for function declarations
    #[arg(long)]
    function: bool,

    /// Search for function template declarations
    #[arg(long)]
    function_template: bool,

    /// Search for any function, member function or function template
    #[arg(short = 'F')]
    any_function: bool,

    /// Search for class declarations
    #[arg(long)]
    class: bool,

    /// Search for class template declarations
    #[arg(long)]
    class_template: bool,

    /// Search for class constructors
    #[arg(long)]
    class_constructor: bool,

    /// Search for class destructors
    #[arg(long)]
    class_destructor: bool,

    /// Search for any class, class template or struct
    #[arg(short = 'C')]
    any_class: bool,

    /// Search for typedef declarations
    #[arg(long)]
    typedef: bool,

    /// Search for using declarations, directives and type aliases
    #[arg(long)]
    using_declaration: bool,

    /// Search for namespace aliases
    #[arg(long)]
    namespace_alias: bool,

    /// Search for variable declarations
    #[arg(long)]
    variable_declaration: bool,

    /// Search for function parameters
    #[arg(long)]
    parameter_declaration: bool,

    /// Search for static_cast expressions
    #[arg(long)]
    static_cast: bool,

    /// Search for dynamic_cast expressions
    #[arg(long)]
    dynamic_cast: bool,

    /// Search for reinterpret_cast expressions
    #[arg(long)]
    reinterpret_cast: bool,

    /// Search for const_cast expressions
    #[arg(long)]
    const_cast: bool,

    /// Search for any of the four named casts
    #[arg(short = 'c')]
    any_cast: bool,

    /// Search for throw expressions
    #[arg(long)]
    throw_expression: bool,

    /// Search for for statements, including range-based for
    #[arg(long)]
    for_statement: bool,

    /// Also report references to values, members and fields
    #[arg(long, visible_alias = "ie")]
    include_expressions: bool,

    /// Check the query against each match's full snippet text instead of its name
    #[arg(long)]
    match_snippet_text: bool,

    /// Skip matches that start and end on the same line
    #[arg(long = "ignore-single-line-results", visible_alias = "isl")]
    ignore_single_line: bool,

    /// Additional include directory for the parser (repeatable)
    #[arg(short = 'I', long = "include-dir")]
    include_dirs: Vec<PathBuf>,

    /// Language passed to the parser as `-x`
    #[arg(short = 'l', long, default_value = "c++")]
    language: String,

    /// Language standard passed as `-std=` for C++
    #[arg(long = "std", default_value = "c++17")]
    std: String,

    /// Print results as a JSON array
    #[arg(long)]
    json: bool,

    /// Disable coloured output
    #[arg(long, visible_alias = "nc")]
    no_color: bool,

    /// Log progress and parser flags
    #[arg(long)]
    verbose: bool,

    /// Configuration file layered over the global and local ones
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn categories(&self) -> Vec<Category> {
        let groups: [(bool, &[Category]); 24] = [
            (self.enum_decl, &[Category::Enum]),
            (self.struct_decl, &[Category::Struct]),
            (self.union_decl, &[Category::Union]),
            (self.member_function, &[Category::MemberFunction]),
            (self.function, &[Category::Function]),
            (self.function_template, &[Category::FunctionTemplate]),
            (
                self.any_function,
                &[Category::Function, Category::MemberFunction, Category::FunctionTemplate],
            ),
            (self.class, &[Category::Class]),
            (self.class_template, &[Category::ClassTemplate]),
            (self.class_constructor, &[Category::Constructor]),
            (self.class_destructor, &[Category::Destructor]),
            (
                self.any_class,
                &[Category::Class, Category::ClassTemplate, Category::Struct],
            ),
            (self.typedef, &[Category::Typedef]),
            (self.using_declaration, &[Category::UsingDeclaration]),
            (self.namespace_alias, &[Category::NamespaceAlias]),
            (self.variable_declaration, &[Category::VariableDeclaration]),
            (self.parameter_declaration, &[Category::ParameterDeclaration]),
            (self.static_cast, &[Category::StaticCast]),
            (self.dynamic_cast, &[Category::DynamicCast]),
            (self.reinterpret_cast, &[Category::ReinterpretCast]),
            (self.const_cast, &[Category::ConstCast]),
            (
                self.any_cast,
                &[
                    Category::StaticCast,
                    Category::DynamicCast,
                    Category::ReinterpretCast,
                    Category::ConstCast,
                ],
            ),
            (self.throw_expression, &[Category::ThrowExpression]),
            (self.for_statement, &[Category::ForStatement]),
        ];

        groups
            .iter()
            .filter(|(enabled, _)| *enabled)
            .flat_map(|(_, categories)| categories.iter().copied())
            .collect()
    }

    fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            query: self.query.clone(),
            paths: self.paths.clone(),
            filters: self.filters.clone(),
            excludes: self.excludes.clone(),
            no_ignore_dirs: self.no_ignore_dirs,
            thread_count: self
                .threads
                .unwrap_or_else(|| SearchConfig::default().thread_count),
            include_dirs: self.include_dirs.clone(),
            language: self.language.clone(),
            std: self.std.clone(),
            exact_match: self.exact_match,
            ignore_single_line: self.ignore_single_line,
            include_expressions: self.include_expressions,
            match_snippet_text: self.match_snippet_text,
            categories: self.categories(),
            color: !self.no_color,
            json: self.json,
            log_level: if self.verbose { "debug" } else { "warn" }.to_string(),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through the error path too
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red().bold());
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config =
        SearchConfig::load_from(cli.config.as_deref())?.merge_with_cli(cli.to_search_config());

    init_logging(&config.log_level);
    debug!("Resolved configuration: {:?}", config);

    let color = config.color && io::stdout().is_terminal();
    colored::control::set_override(color);

    let parser = Arc::new(CppParser::new());

    if config.json {
        let sink = Arc::new(JsonSink::new());
        search_with(&config, parser, Some(Arc::clone(&sink) as Arc<dyn ResultSink>))?;
        println!("{}", sink.to_json().map_err(io::Error::from)?);
    } else {
        let sink: Arc<dyn ResultSink> = Arc::new(TerminalSink::stdout(color));
        search_with(&config, parser, Some(sink))?;
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
