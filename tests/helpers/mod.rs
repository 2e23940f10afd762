//! Shared helpers for the integration suites.

use cppdoc::Project;
use cppdoc::project::{CompKind, FileKind};
use cppdoc::semantic::{EntityData, EntityId, EntityKind, lookup_string};

/// Build a project from in-memory files and run the full pipeline.
/// Paths choose the file kind by suffix.
#[allow(dead_code)]
pub fn build(files: &[(&str, &str)]) -> Project {
    let mut prj = Project::new("test");
    let comp = prj.add_component("test", CompKind::Library);
    for (path, text) in files {
        let kind = FileKind::from_path(path).expect("unrecognized suffix");
        prj.register_file(comp, path, kind, Some((*text).to_string()));
    }
    prj.process();
    prj
}

/// Build and require that no file recorded an error.
#[allow(dead_code)]
pub fn build_clean(files: &[(&str, &str)]) -> Project {
    let prj = build(files);
    let errors: Vec<String> = prj
        .diags
        .all()
        .iter()
        .filter(|d| d.severity.is_error())
        .map(|d| d.format())
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {errors:#?}");
    prj
}

/// Resolve an entity by (possibly qualified) name from the root.
#[allow(dead_code)]
pub fn find(prj: &Project, name: &str) -> Option<EntityId> {
    lookup_string(&prj.model, name, None)
}

#[allow(dead_code)]
pub fn find_kind(prj: &Project, name: &str, kind: EntityKind) -> EntityId {
    let id = find(prj, name).unwrap_or_else(|| panic!("entity '{name}' not found"));
    assert_eq!(prj.model.entity(id).kind(), kind, "kind of '{name}'");
    id
}

/// The member function of a group with the given extended name.
#[allow(dead_code)]
pub fn func_by_ext(prj: &Project, group_name: &str, ext: &str) -> EntityId {
    let group = find_kind(prj, group_name, EntityKind::FuncGroup);
    let EntityData::FuncGroup(g) = &prj.model.entity(group).data else {
        unreachable!()
    };
    g.funcs
        .iter()
        .copied()
        .find(|&f| {
            prj.model
                .entity(f)
                .as_func()
                .map(|fd| fd.ext_name.as_str() == ext)
                .unwrap_or(false)
        })
        .unwrap_or_else(|| panic!("no function {ext} in group {group_name}"))
}

/// Count warnings whose message contains a fragment.
#[allow(dead_code)]
pub fn warnings_containing(prj: &Project, fragment: &str) -> usize {
    prj.diags
        .all()
        .iter()
        .filter(|d| !d.severity.is_error() && d.message.contains(fragment))
        .count()
}
