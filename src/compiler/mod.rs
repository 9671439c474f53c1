// FILE: src/compiler/mod.rs

// The phase pipeline: a Project owns the discovered files and the registered
// directive handlers for one compilation pass and drives the handlers through
// the lifecycle phases.

pub(crate) mod conditional;
pub mod directives;
pub mod expression;
pub(crate) mod graph;
mod handler;
mod phase;
pub(crate) mod writer;

pub use handler::DirectiveHandler;
pub use phase::Phase;

use crate::core::constants::SOURCE_EXTENSION;
use crate::core::{resolve_reference, FileId, SourceFile};
use crate::error::{CompilerError, Result};
use crate::{CompilationStats, ConfigMap, ProjectOptions};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseStatus {
    Running,
    Done,
}

/// State of one compilation pass.
#[derive(Debug)]
pub struct Project {
    input: PathBuf,
    output: PathBuf,
    config: ConfigMap,
    files: Vec<SourceFile>,
    index: BTreeMap<String, FileId>,
    handlers: Vec<Rc<dyn DirectiveHandler>>,
    completion: HashMap<(&'static str, Phase), PhaseStatus>,
    stats: CompilationStats,
    dirty: bool,
}

impl Project {
    /// Create a project with the built-in directive handlers registered.
    pub fn new(options: ProjectOptions) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let mut project = Self {
            input: cwd.join(&options.input),
            output: cwd.join(&options.output),
            config: options.config,
            files: Vec::new(),
            index: BTreeMap::new(),
            handlers: Vec::new(),
            completion: HashMap::new(),
            stats: CompilationStats::default(),
            dirty: false,
        };
        for handler in directives::default_handlers() {
            project.register_handler(handler);
        }
        Ok(project)
    }

    /// Register a handler. A handler with the same keyword is replaced in
    /// place; otherwise the new one runs after every existing handler.
    pub fn register_handler(&mut self, handler: Rc<dyn DirectiveHandler>) {
        let keyword = handler.keyword();
        match self.handlers.iter().position(|h| h.keyword() == keyword) {
            Some(position) => self.handlers[position] = handler,
            None => self.handlers.push(handler),
        }
    }

    pub fn handler_keywords(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.keyword()).collect()
    }

    /// Run one full compilation pass. A project that already ran a pass is
    /// reset first.
    pub fn compile(&mut self) -> Result<CompilationStats> {
        if self.dirty {
            log::debug!("Resetting project before a new pass");
            self.reset()?;
        }
        self.dirty = true;

        let start_time = Instant::now();
        if let Err(e) = self.run_pass() {
            log::error!("Compilation pass aborted: {}", e);
            self.close_outputs();
            return Err(e);
        }

        self.stats.compile_time_ms = start_time.elapsed().as_millis() as u64;
        log::info!(
            "Compiled {} files ({} written, {} hidden) in {}ms",
            self.stats.files_discovered,
            self.stats.files_written,
            self.stats.files_hidden,
            self.stats.compile_time_ms
        );
        Ok(self.stats.clone())
    }

    fn run_pass(&mut self) -> Result<()> {
        if !self.input.is_dir() {
            return Err(CompilerError::InputDirectoryMissing {
                path: self.input.display().to_string(),
            });
        }
        if same_directory(&self.input, &self.output) {
            return Err(CompilerError::output_directory(
                self.output.display().to_string(),
                "Output root must differ from the input root",
            ));
        }
        writer::prepare_output_root(&self.output)?;

        self.run_phase(Phase::Initialize)?;
        self.discover()?;

        for phase in &Phase::PASS[1..] {
            if *phase == Phase::Complete {
                self.write_outputs()?;
            }
            self.run_phase(*phase)?;
        }
        Ok(())
    }

    /// Close every output handle, drop all files and per-pass state, and run
    /// the handlers' `reset` callbacks.
    pub fn reset(&mut self) -> Result<()> {
        self.close_outputs();
        self.files.clear();
        self.index.clear();
        self.stats = CompilationStats::default();
        self.completion.clear();

        let result = self.run_phase(Phase::Reset);
        self.completion.clear();
        self.dirty = false;
        result
    }

    fn close_outputs(&mut self) {
        for file in &mut self.files {
            if let Err(e) = file.close_output() {
                log::warn!("Failed to close output for {}: {}", file.path, e);
            }
        }
    }

    /// Run `phase` of the handler registered for `keyword` now, unless it
    /// already ran during this pass. Unknown keywords and phases the handler
    /// does not implement are no-ops. Requesting a phase that is currently
    /// running fails with `PhaseReentrancy`.
    pub fn ensure(&mut self, phase: Phase, keyword: &str) -> Result<()> {
        let Some(handler) = self.handlers.iter().find(|h| h.keyword() == keyword).cloned() else {
            return Ok(());
        };
        if !handler.phases().contains(&phase) {
            return Ok(());
        }

        let key = (handler.keyword(), phase);
        match self.completion.get(&key) {
            Some(PhaseStatus::Done) => return Ok(()),
            Some(PhaseStatus::Running) => {
                return Err(CompilerError::PhaseReentrancy {
                    keyword: keyword.to_string(),
                    phase,
                })
            }
            None => {}
        }

        self.completion.insert(key, PhaseStatus::Running);
        log::debug!("Running {} for @{}", phase, keyword);
        let result = self.run_handler(handler.as_ref(), phase);
        self.completion.insert(key, PhaseStatus::Done);
        result
    }

    /// Whether `phase` of `keyword` already finished during this pass.
    pub fn is_complete(&self, phase: Phase, keyword: &str) -> bool {
        self.handlers
            .iter()
            .find(|h| h.keyword() == keyword)
            .map(|h| self.completion.get(&(h.keyword(), phase)) == Some(&PhaseStatus::Done))
            .unwrap_or(false)
    }

    fn run_phase(&mut self, phase: Phase) -> Result<()> {
        let keywords = self.handler_keywords();
        for keyword in keywords {
            self.ensure(phase, keyword)?;
        }
        Ok(())
    }

    fn run_handler(&mut self, handler: &dyn DirectiveHandler, phase: Phase) -> Result<()> {
        if !phase.is_per_file() {
            let result = match phase {
                Phase::Initialize => handler.initialize(self),
                Phase::AllPrepared => handler.all_prepared(self),
                Phase::AllProcessed => handler.all_processed(self),
                Phase::AllCompleted => handler.all_completed(self),
                _ => handler.reset(self),
            };
            return result.map_err(|e| e.during(phase, format!("@{}", handler.keyword())));
        }

        for id in self.file_ids() {
            if !phase.includes_hidden() && self.file(id).is_hidden() {
                continue;
            }
            let result = match phase {
                Phase::Prepare => handler.prepare(self, id).map(|hide| {
                    if let Some(hidden) = hide {
                        self.file_mut(id).set_hidden(hidden);
                    }
                }),
                Phase::Process => handler.process(self, id),
                _ => handler.complete(self, id),
            };
            if let Err(e) = result {
                let path = self.file(id).path.clone();
                return Err(e.during(phase, path));
            }
        }
        Ok(())
    }

    /// Scan the input tree for source files. The output root is skipped when
    /// it lives inside the input root.
    fn discover(&mut self) -> Result<()> {
        let output = self.output.clone();
        let walker = WalkDir::new(&self.input)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.path() != output);

        for entry in walker {
            let entry = entry.map_err(|e| {
                CompilerError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Directory traversal error: {}", e),
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.input) else {
                continue;
            };
            let path = relative_key(relative);
            self.add_file(&path)?;
        }

        self.stats.files_discovered = self.files.len();
        self.stats.directive_count = self.files.iter().map(|f| f.all_directives().len()).sum();
        log::debug!("Discovered {} source files under {}", self.files.len(), self.input.display());
        Ok(())
    }

    fn add_file(&mut self, path: &str) -> Result<FileId> {
        let id = FileId(self.files.len());
        let file = SourceFile::load(id, path, self.input.join(path), self.output.join(path))?;
        self.files.push(file);
        self.index.insert(path.to_string(), id);
        Ok(id)
    }

    fn write_outputs(&mut self) -> Result<()> {
        for id in self.file_ids() {
            let file = &mut self.files[id.0];
            if file.is_hidden() {
                self.stats.files_hidden += 1;
                continue;
            }
            self.stats.output_size += writer::write_file(file)?;
            self.stats.files_written += 1;
        }
        Ok(())
    }

    /// All file ids, ordered by relative path.
    pub fn file_ids(&self) -> Vec<FileId> {
        self.index.values().copied().collect()
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.0]
    }

    pub fn file_by_path(&self, path: &str) -> Option<&SourceFile> {
        self.index.get(path.trim_start_matches('/')).map(|id| self.file(*id))
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.index.values().map(move |id| &self.files[id.0])
    }

    /// Resolve every argument of every `keyword` directive in `file`, in
    /// order of appearance.
    pub fn resolve_directive_targets(&self, file: FileId, keyword: &str) -> Result<Vec<FileId>> {
        let source = self.file(file);
        let mut targets = Vec::new();
        for directive in source.directives(keyword) {
            for argument in directive.args.items() {
                targets.push(self.resolve_argument(file, keyword, directive.line, argument)?);
            }
        }
        Ok(targets)
    }

    /// Resolve a single directive argument relative to `file`.
    pub fn resolve_argument(&self, file: FileId, keyword: &str, line: usize, argument: &str) -> Result<FileId> {
        let source = self.file(file);
        resolve_reference(&self.index, source.directory(), argument)
            .ok_or_else(|| CompilerError::unresolved(&source.path, line, keyword, argument))
    }

    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    /// Truthiness of a configuration value; missing keys are false.
    pub fn config_flag(&self, key: &str) -> bool {
        self.config.get(key).map(expression::truthy).unwrap_or(false)
    }

    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Recorder {
        keyword: &'static str,
        phases: &'static [Phase],
        log: Rc<RefCell<Vec<String>>>,
        ensure: Option<(Phase, &'static str)>,
    }

    impl Recorder {
        fn record(&self, project: &mut Project, phase: Phase, file: Option<FileId>) -> Result<()> {
            if let Some((phase, keyword)) = self.ensure {
                project.ensure(phase, keyword)?;
            }
            let entry = match file {
                Some(id) => format!("{}:{}:{}", self.keyword, phase, project.file(id).path),
                None => format!("{}:{}", self.keyword, phase),
            };
            self.log.borrow_mut().push(entry);
            Ok(())
        }
    }

    impl DirectiveHandler for Recorder {
        fn keyword(&self) -> &'static str {
            self.keyword
        }

        fn phases(&self) -> &'static [Phase] {
            self.phases
        }

        fn initialize(&self, project: &mut Project) -> Result<()> {
            self.record(project, Phase::Initialize, None)
        }

        fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
            self.record(project, Phase::Prepare, Some(file))?;
            Ok(None)
        }

        fn process(&self, project: &mut Project, file: FileId) -> Result<()> {
            self.record(project, Phase::Process, Some(file))
        }

        fn all_processed(&self, project: &mut Project) -> Result<()> {
            self.record(project, Phase::AllProcessed, None)
        }

        fn reset(&self, project: &mut Project) -> Result<()> {
            self.record(project, Phase::Reset, None)
        }
    }

    fn setup(files: &[(&str, &str)]) -> (TempDir, Project) {
        let temp_dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp_dir.path().join("src").join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let options = ProjectOptions::new(temp_dir.path().join("src"), temp_dir.path().join("build"));
        let project = Project::new(options).unwrap();
        (temp_dir, project)
    }

    #[test]
    fn test_ensure_runs_requested_phase_once() {
        let (_dir, mut project) = setup(&[("a.js", "a"), ("_b.js", "b")]);
        let log = Rc::new(RefCell::new(Vec::new()));
        project.register_handler(Rc::new(Recorder {
            keyword: "first",
            phases: &[Phase::Prepare],
            log: log.clone(),
            ensure: Some((Phase::Prepare, "second")),
        }));
        project.register_handler(Rc::new(Recorder {
            keyword: "second",
            phases: &[Phase::Prepare, Phase::Process],
            log: log.clone(),
            ensure: None,
        }));

        project.compile().unwrap();
        assert!(project.is_complete(Phase::Prepare, "second"));
        assert!(project.is_complete(Phase::Process, "second"));
        assert!(!project.is_complete(Phase::Process, "first"));
        assert!(!project.is_complete(Phase::Prepare, "unknown"));

        let log = log.borrow();
        assert_eq!(
            *log,
            vec![
                "second:prepare:_b.js",
                "second:prepare:a.js",
                "first:prepare:_b.js",
                "first:prepare:a.js",
                "second:process:a.js",
            ]
        );
    }

    #[test]
    fn test_reentrant_request_fails_fast() {
        let (_dir, mut project) = setup(&[("a.js", "a")]);
        let log = Rc::new(RefCell::new(Vec::new()));
        project.register_handler(Rc::new(Recorder {
            keyword: "ping",
            phases: &[Phase::Prepare],
            log: log.clone(),
            ensure: Some((Phase::Prepare, "pong")),
        }));
        project.register_handler(Rc::new(Recorder {
            keyword: "pong",
            phases: &[Phase::Prepare],
            log,
            ensure: Some((Phase::Prepare, "ping")),
        }));

        let err = project.compile().unwrap_err();
        match err.root_cause() {
            CompilerError::PhaseReentrancy { keyword, phase } => {
                assert_eq!(keyword, "ping");
                assert_eq!(*phase, Phase::Prepare);
            }
            other => panic!("Expected reentrancy error, got {:?}", other),
        }
    }

    #[test]
    fn test_whole_pass_phases_and_reset() {
        let (_dir, mut project) = setup(&[("a.js", "a")]);
        let log = Rc::new(RefCell::new(Vec::new()));
        project.register_handler(Rc::new(Recorder {
            keyword: "watcher",
            phases: &[Phase::Initialize, Phase::AllProcessed, Phase::Reset],
            log: log.clone(),
            ensure: None,
        }));

        project.compile().unwrap();
        assert_eq!(project.files().count(), 1);
        project.reset().unwrap();
        assert_eq!(project.files().count(), 0);
        project.compile().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "watcher:initialize",
                "watcher:allProcessed",
                "watcher:reset",
                "watcher:initialize",
                "watcher:allProcessed",
            ]
        );
    }

    #[test]
    fn test_discovery_skips_non_sources_and_nested_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("src");
        fs::create_dir_all(input.join("lib")).unwrap();
        fs::write(input.join("main.js"), "main").unwrap();
        fs::write(input.join("lib/util.js"), "util").unwrap();
        fs::write(input.join("notes.txt"), "notes").unwrap();

        let mut project = Project::new(ProjectOptions::new(&input, input.join("out"))).unwrap();
        project.compile().unwrap();
        project.reset().unwrap();
        // The second pass must not pick up the first pass's output.
        let stats = project.compile().unwrap();

        let paths: Vec<&str> = project.files().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["lib/util.js", "main.js"]);
        assert_eq!(stats.files_discovered, 2);
        assert_eq!(stats.files_written, 2);
    }

    #[test]
    fn test_missing_input_directory() {
        let temp_dir = TempDir::new().unwrap();
        let options = ProjectOptions::new(temp_dir.path().join("nope"), temp_dir.path().join("out"));
        let mut project = Project::new(options).unwrap();
        assert!(matches!(
            project.compile(),
            Err(CompilerError::InputDirectoryMissing { .. })
        ));
    }

    #[test]
    fn test_output_root_equal_to_input_root_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("src");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("main.js"), "main").unwrap();

        // Spelled differently so only the resolved paths match.
        let output = input.join("..").join("src");
        let mut project = Project::new(ProjectOptions::new(&input, &output)).unwrap();
        match project.compile() {
            Err(CompilerError::OutputDirectory { message, .. }) => {
                assert_eq!(message, "Output root must differ from the input root");
            }
            other => panic!("Expected output directory error, got {:?}", other),
        }
        assert!(fs::read_dir(&input).unwrap().count() == 1);

        let mut project = Project::new(ProjectOptions::new(&input, &input)).unwrap();
        assert!(matches!(
            project.compile(),
            Err(CompilerError::OutputDirectory { .. })
        ));
    }
}
