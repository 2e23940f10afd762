//! Project configuration loading.
//!
//! The configuration is an XML document declaring the project, its
//! components in processing order, and each component's file lists:
//!
//! ```xml
//! <project name="hadronzoo" tabwidth="4">
//!     <component name="hzlib" type="Library" title="HadronZoo Library">
//!         <sysinc>data/standards.sys</sysinc>
//!         <header>inc/hzChars.h</header>
//!         <source>src/hzChars.cpp</source>
//!         <document>notes/overview.txt</document>
//!     </component>
//! </project>
//! ```
//!
//! File kinds follow the element name; a `<file>` element falls back
//! to suffix recognition.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::diag::ErrorCode;

use super::{CompKind, FileKind, Project};

fn attr(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

/// Parse a configuration document into a project. `base_dir` anchors
/// relative file paths.
pub fn load_config(xml: &str, base_dir: &Path) -> Result<Project, ErrorCode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut prj: Option<Project> = None;
    let mut comp = None;
    let mut element: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"project" => {
                    let name = attr(&e, "name").unwrap_or_else(|| "project".to_string());
                    let mut p = Project::new(name.as_str());
                    if let Some(tw) = attr(&e, "tabwidth").and_then(|t| t.parse().ok()) {
                        p.tab_width = tw;
                    }
                    prj = Some(p);
                }
                b"component" => {
                    let Some(p) = prj.as_mut() else {
                        return Err(ErrorCode::Format);
                    };
                    let name = attr(&e, "name").ok_or(ErrorCode::Format)?;
                    let kind = match attr(&e, "type").as_deref() {
                        Some("Library") | Some("library") => CompKind::Library,
                        Some("Program") | Some("program") => CompKind::Program,
                        Some("Suite") | Some("suite") => CompKind::Suite,
                        _ => CompKind::Library,
                    };
                    let id = p.add_component(name.as_str(), kind);
                    if let Some(title) = attr(&e, "title") {
                        p.comps[id.index()].title = title.into();
                    }
                    comp = Some(id);
                }
                b"header" | b"source" | b"sysinc" | b"document" | b"file" => {
                    element = Some(String::from_utf8_lossy(e.name().as_ref()).to_string());
                }
                _ => {}
            },

            Ok(Event::Text(t)) => {
                let Some(elem) = element.as_deref() else { continue };
                let Some(p) = prj.as_mut() else { continue };
                let Some(c) = comp else {
                    return Err(ErrorCode::Format);
                };
                let rel = t.unescape().map_err(|_| ErrorCode::Format)?.to_string();
                let kind = match elem {
                    "header" => FileKind::Header,
                    "source" => FileKind::Source,
                    "sysinc" => FileKind::SysInc,
                    "document" => FileKind::Document,
                    _ => match FileKind::from_path(&rel) {
                        Some(k) => k,
                        None => {
                            p.diags.warning(
                                "load_config",
                                "config",
                                0,
                                0,
                                format!("unrecognized file suffix: {rel}"),
                            );
                            continue;
                        }
                    },
                };
                let full = base_dir.join(&rel).to_string_lossy().to_string();
                p.register_file(c, &full, kind, None);
            }

            Ok(Event::End(e)) => match e.name().as_ref() {
                b"component" => comp = None,
                b"header" | b"source" | b"sysinc" | b"document" | b"file" => element = None,
                _ => {}
            },

            Ok(Event::Eof) => break,
            Err(_) => return Err(ErrorCode::Format),
            _ => {}
        }
    }

    prj.ok_or(ErrorCode::Format)
}

impl Project {
    /// Load the component and file lists from a configuration file.
    pub fn init_project(cfg_path: &str) -> Result<Project, ErrorCode> {
        let xml = std::fs::read_to_string(cfg_path).map_err(|_| ErrorCode::OpenFail)?;
        let base = Path::new(cfg_path).parent().unwrap_or(Path::new("."));
        load_config(&xml, base)
    }

    /// Serialize the entity model (see [`crate::export`]).
    pub fn export_entities<W: std::io::Write>(&self, out: W) -> Result<(), ErrorCode> {
        crate::export::export_entities(self, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let xml = r#"
            <project name="demo" tabwidth="8">
                <component name="lib" type="Library" title="Demo Library">
                    <header>inc/a.h</header>
                    <source>src/a.cpp</source>
                </component>
                <component name="app" type="Program">
                    <source>src/main.cpp</source>
                </component>
            </project>
        "#;
        let prj = load_config(xml, Path::new("/base")).unwrap();
        assert_eq!(prj.name, "demo");
        assert_eq!(prj.tab_width, 8);
        assert_eq!(prj.comps.len(), 2);
        assert_eq!(prj.comps[0].headers.len(), 1);
        assert_eq!(prj.comps[0].sources.len(), 1);
        assert_eq!(prj.comps[1].kind, CompKind::Program);
        assert!(prj.file_by_path("/base/inc/a.h").is_some());
    }

    #[test]
    fn test_component_required_before_files() {
        let xml = "<project name=\"x\"><header>a.h</header></project>";
        assert!(load_config(xml, Path::new(".")).is_err());
    }
}
