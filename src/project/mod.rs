//! The project: components, files, and the per-component driver.
//!
//! A project is a hierarchy of components (libraries, programs,
//! suites), each owning header, source, system-include and document
//! files. The driver activates (reads and lexes) each file exactly
//! once, preprocesses sources with their transitive includes, parses
//! in include-graph order, and finally offers unattached top-level
//! comments to the external comment processor.

pub mod config;

use std::collections::VecDeque;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{FileId, Interner};
use crate::diag::{DiagSink, ErrorCode};
use crate::lexer;
use crate::semantic::{CompId, EntityId, Model, ScopeId, Stmt};
use crate::token::Token;

/// Kind of a registered file, recognized by suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.h`
    Header,
    /// `.cpp`
    Source,
    /// `.txt`
    Document,
    /// `.sys`: dummy definitions of standard entities; everything
    /// parsed from one is marked internal
    SysInc,
}

impl FileKind {
    pub fn from_path(path: &str) -> Option<FileKind> {
        let ext = path.rsplit('.').next()?;
        match ext {
            "h" => Some(FileKind::Header),
            "cpp" => Some(FileKind::Source),
            "txt" => Some(FileKind::Document),
            "sys" => Some(FileKind::SysInc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Header => "header",
            FileKind::Source => "source",
            FileKind::Document => "document",
            FileKind::SysInc => "system include",
        }
    }
}

/// Kind of a project component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    Library,
    Program,
    Suite,
}

/// A registered source, header, system-include or document file.
#[derive(Debug)]
pub struct SourceFile {
    pub id: FileId,
    /// Basename, the key #include directives resolve against
    pub name: SmolStr,
    pub path: String,
    pub kind: FileKind,
    pub comp: Option<CompId>,
    /// In-memory content; files registered from disk read at
    /// activation instead
    pub text: Option<String>,
    /// Raw token stream P (lex output, comments included)
    pub raw: Vec<Token>,
    /// Active token stream X (preprocessor output, parser input)
    pub active: Vec<Token>,
    /// Files included directly, in directive order
    pub direct_inc: Vec<FileId>,
    /// All effective includes by basename
    pub includes: IndexMap<SmolStr, FileId>,
    /// File-static entity table, created on demand
    pub table: Option<ScopeId>,
    /// Top level statements
    pub stmts: Vec<Stmt>,
    /// Lexed (activation happened)
    pub lexed: bool,
    /// Preprocessed
    pub stage1: bool,
    /// Parsed
    pub stage2: bool,
    pub has_main: bool,
}

/// A project component: a library, a program, or a suite collating
/// files common to more than one program.
#[derive(Debug)]
pub struct Component {
    pub id: CompId,
    pub name: SmolStr,
    pub title: SmolStr,
    pub kind: CompKind,
    pub copyright: SmolStr,
    pub sysinc: Vec<FileId>,
    pub headers: Vec<FileId>,
    pub sources: Vec<FileId>,
    pub documents: Vec<FileId>,
    pub complete: bool,
}

/// A synopsis article created by an external comment.
#[derive(Debug, Clone)]
pub struct Synopsis {
    pub name: SmolStr,
    pub docname: SmolStr,
    /// Chapter and paragraph order string, e.g. `1.2.3`
    pub order: SmolStr,
    pub content: String,
    pub file: FileId,
}

/// A member function body recorded during a class definition, parsed
/// once the class's entity table is fully populated.
#[derive(Debug, Clone, Copy)]
pub struct DeferredBody {
    pub func: EntityId,
    pub host: Option<EntityId>,
    pub file: FileId,
    /// Active-stream index of the opening `{`
    pub start: u32,
}

/// Status of one processed component
#[derive(Debug, Clone, Copy, Default)]
pub struct CompStatus {
    pub files_ok: u32,
    pub files_failed: u32,
}

/// The whole project under examination.
#[derive(Debug)]
pub struct Project {
    pub name: SmolStr,
    pub interner: Interner,
    pub model: Model,
    pub diags: DiagSink,
    pub files: Vec<SourceFile>,
    pub comps: Vec<Component>,
    headers_by_name: FxHashMap<SmolStr, Vec<FileId>>,
    sources_by_name: FxHashMap<SmolStr, Vec<FileId>>,
    sysinc_by_name: FxHashMap<SmolStr, Vec<FileId>>,
    by_path: FxHashMap<String, FileId>,
    /// #define / literal / macro registry for expansion
    pub defines: FxHashMap<SmolStr, EntityId>,
    /// Function bodies pending secondary parse
    pub deferred: VecDeque<DeferredBody>,
    /// Namespace the parser currently adds entities to
    pub cur_namespace: Option<EntityId>,
    pub synopses: IndexMap<SmolStr, Synopsis>,
    pub tab_width: u32,
}

impl Project {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            interner: Interner::new(),
            model: Model::new(),
            diags: DiagSink::new(),
            files: Vec::new(),
            comps: Vec::new(),
            headers_by_name: FxHashMap::default(),
            sources_by_name: FxHashMap::default(),
            sysinc_by_name: FxHashMap::default(),
            by_path: FxHashMap::default(),
            defines: FxHashMap::default(),
            deferred: VecDeque::new(),
            cur_namespace: None,
            synopses: IndexMap::new(),
            tab_width: 4,
        }
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.index()]
    }

    pub fn comp(&self, id: CompId) -> &Component {
        &self.comps[id.index()]
    }

    pub fn add_component(&mut self, name: impl Into<SmolStr>, kind: CompKind) -> CompId {
        let id = CompId(self.comps.len() as u32);
        let name = name.into();
        self.comps.push(Component {
            id,
            title: name.clone(),
            name,
            kind,
            copyright: SmolStr::default(),
            sysinc: Vec::new(),
            headers: Vec::new(),
            sources: Vec::new(),
            documents: Vec::new(),
            complete: false,
        });
        id
    }

    fn basename(path: &str) -> &str {
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Register a file with a component. Content is read from disk at
    /// activation unless supplied here.
    pub fn register_file(
        &mut self,
        comp: CompId,
        path: &str,
        kind: FileKind,
        text: Option<String>,
    ) -> FileId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        let id = FileId::new(self.files.len());
        let name = SmolStr::new(Self::basename(path));
        self.files.push(SourceFile {
            id,
            name: name.clone(),
            path: path.to_string(),
            kind,
            comp: Some(comp),
            text,
            raw: Vec::new(),
            active: Vec::new(),
            direct_inc: Vec::new(),
            includes: IndexMap::new(),
            table: None,
            stmts: Vec::new(),
            lexed: false,
            stage1: false,
            stage2: false,
            has_main: false,
        });
        self.by_path.insert(path.to_string(), id);
        let index = match kind {
            FileKind::Header => &mut self.headers_by_name,
            FileKind::Source => &mut self.sources_by_name,
            FileKind::SysInc => &mut self.sysinc_by_name,
            FileKind::Document => {
                let c = &mut self.comps[comp.index()];
                c.documents.push(id);
                return id;
            }
        };
        index.entry(name).or_default().push(id);
        let c = &mut self.comps[comp.index()];
        match kind {
            FileKind::Header => c.headers.push(id),
            FileKind::Source => c.sources.push(id),
            FileKind::SysInc => c.sysinc.push(id),
            FileKind::Document => {}
        }
        id
    }

    /// Locate a file by basename only; `#include` directives do not
    /// generally give the full path. An ambiguous basename resolves to
    /// nothing.
    pub fn locate_file(&self, name: &str) -> Option<FileId> {
        for index in [&self.headers_by_name, &self.sysinc_by_name, &self.sources_by_name] {
            if let Some(ids) = index.get(name) {
                if ids.len() == 1 {
                    return Some(ids[0]);
                }
                return None;
            }
        }
        None
    }

    pub fn file_by_path(&self, path: &str) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    // -----------------------------------------------------------------
    // Driver
    // -----------------------------------------------------------------

    /// Read, detab and lex a file. Each file is lexed exactly once.
    pub fn activate(&mut self, fid: FileId) -> Result<(), ErrorCode> {
        if self.file(fid).lexed {
            return Ok(());
        }
        let path = self.file(fid).path.clone();
        let name = self.file(fid).name.clone();
        let src = match self.file_mut(fid).text.take() {
            Some(t) => t,
            None => match std::fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    self.diags.fatal(
                        "activate",
                        ErrorCode::OpenFail,
                        &name,
                        0,
                        0,
                        format!("cannot open {path}: {e}"),
                    );
                    return Err(ErrorCode::OpenFail);
                }
            },
        };
        let toks = lexer::tokenize(&src, &name, self.tab_width, &mut self.interner, &mut self.diags)?;
        let f = self.file_mut(fid);
        f.raw = toks;
        f.lexed = true;
        tracing::debug!("activated {} ({} tokens)", name, self.file(fid).raw.len());
        Ok(())
    }

    /// Run the full pipeline for one component: activate every file,
    /// preprocess and parse system includes first (under the system
    /// mask), then sources in configured order (headers follow the
    /// include graph), then any header no source pulled in. Deferred
    /// function bodies drain as their classes complete; a final drain
    /// catches stragglers. Unattached top-level comments then go to
    /// the external comment processor.
    pub fn process_component(&mut self, comp: CompId) -> Result<CompStatus, ErrorCode> {
        let mut status = CompStatus::default();
        let sysinc = self.comp(comp).sysinc.clone();
        let headers = self.comp(comp).headers.clone();
        let sources = self.comp(comp).sources.clone();

        for &fid in sysinc.iter().chain(&headers).chain(&sources) {
            if self.activate(fid).is_err() {
                status.files_failed += 1;
            }
        }

        for &fid in &sysinc {
            self.model.system_mask = true;
            let r = self.run_file(fid);
            self.model.system_mask = false;
            Self::tally(&mut status, r);
        }
        for &fid in &sources {
            let r = self.run_file(fid);
            Self::tally(&mut status, r);
        }
        for &fid in &headers {
            if !self.file(fid).stage2 {
                let r = self.run_file(fid);
                Self::tally(&mut status, r);
            }
        }

        crate::parser::drain_deferred(self)?;

        for &fid in sysinc.iter().chain(&headers).chain(&sources) {
            crate::comments::process_unattached(self, fid);
        }

        self.integrity(comp);
        self.comps[comp.index()].complete = true;
        Ok(status)
    }

    fn tally(status: &mut CompStatus, r: Result<(), ErrorCode>) {
        match r {
            Ok(()) => status.files_ok += 1,
            Err(_) => status.files_failed += 1,
        }
    }

    fn run_file(&mut self, fid: FileId) -> Result<(), ErrorCode> {
        if !self.file(fid).lexed {
            return Err(ErrorCode::NoInit);
        }
        crate::preproc::preprocess(self, fid, 0)?;
        crate::parser::parse_file(self, fid, 0)
    }

    /// Only one `main()` per program component.
    fn integrity(&mut self, comp: CompId) {
        if self.comp(comp).kind != CompKind::Program {
            return;
        }
        let mains: Vec<SmolStr> = self
            .comp(comp)
            .sources
            .iter()
            .filter(|&&f| self.file(f).has_main)
            .map(|&f| self.file(f).name.clone())
            .collect();
        if mains.len() > 1 {
            let list = mains.join(", ");
            let name = self.comp(comp).name.clone();
            self.diags.error(
                "integrity",
                ErrorCode::Conflict,
                &name,
                0,
                0,
                format!("program component has multiple main() definitions: {list}"),
            );
        }
    }

    /// Process every component in configured order. Returns the number
    /// of files with at least one error, the process exit code.
    pub fn process(&mut self) -> usize {
        let comps: Vec<CompId> = self.comps.iter().map(|c| c.id).collect();
        for comp in comps {
            let name = self.comp(comp).name.clone();
            match self.process_component(comp) {
                Ok(s) => {
                    tracing::info!(
                        "component {}: {} files ok, {} failed",
                        name,
                        s.files_ok,
                        s.files_failed
                    );
                }
                Err(e) => {
                    tracing::error!("component {} aborted: {}", name, e);
                }
            }
        }
        self.diags.files_with_errors()
    }
}
