//! The model arena: entities, scopes, and the predeclared standard
//! types.

use smol_str::SmolStr;

use crate::diag::{DiagSink, ErrorCode};

use super::entity::{
    Access, Attrs, Basis, Entity, EntityBase, EntityData, EntityId, EntityKind,
};
use super::table::{EntityTable, ScopeId};

/// Ids of the predeclared standard C++ types
#[derive(Debug, Clone, Copy)]
pub struct StdTypes {
    pub void: EntityId,
    pub bool_: EntityId,
    pub char_: EntityId,
    pub uchar: EntityId,
    pub short_: EntityId,
    pub ushort: EntityId,
    pub int_: EntityId,
    pub uint: EntityId,
    pub long_: EntityId,
    pub ulong: EntityId,
    pub longlong: EntityId,
    pub ulonglong: EntityId,
    pub float_: EntityId,
    pub double_: EntityId,
}

fn kind_of(data: &EntityData) -> EntityKind {
    match data {
        EntityData::Namespace { .. } => EntityKind::Namespace,
        EntityData::StdType { .. } => EntityKind::StdType,
        EntityData::Class(_) => EntityKind::Class,
        EntityData::Union(_) => EntityKind::Union,
        EntityData::Enum(_) => EntityKind::Enum,
        EntityData::EnumVal(_) => EntityKind::EnumVal,
        EntityData::Typedef { .. } => EntityKind::Typedef,
        EntityData::TemplateArg { .. } => EntityKind::TemplateArg,
        EntityData::Variable(_) => EntityKind::Variable,
        EntityData::Function(_) => EntityKind::Function,
        EntityData::FuncGroup(_) => EntityKind::FuncGroup,
        EntityData::FuncSet(_) => EntityKind::FuncSet,
        EntityData::Define(_) => EntityKind::Define,
        EntityData::Literal(_) => EntityKind::Literal,
        EntityData::Macro(_) => EntityKind::Macro,
    }
}

/// The entity and scope arenas plus process-wide lookup state.
#[derive(Debug)]
pub struct Model {
    pub entities: Vec<Entity>,
    pub scopes: Vec<EntityTable>,
    pub root: ScopeId,
    pub std: StdTypes,
    /// Namespaces brought into scope by `using namespace`
    pub using: Vec<EntityId>,
    /// While set, every added entity is marked internal (active during
    /// system-include parsing)
    pub system_mask: bool,
}

impl Model {
    pub fn new() -> Self {
        let mut scopes = vec![EntityTable::new(None, "root", None)];
        let mut entities = Vec::new();

        let mut add_std = |name: &str, basis: Basis| {
            let id = EntityId(entities.len() as u32);
            entities.push(Entity {
                id,
                base: EntityBase {
                    name: SmolStr::new(name),
                    fqname: SmolStr::new(name),
                    access: Access::Global,
                    ..Default::default()
                },
                data: EntityData::StdType { basis },
            });
            scopes[0].entries.insert(SmolStr::new(name), id);
            id
        };

        let std = StdTypes {
            void: add_std("void", Basis::Void),
            bool_: add_std("bool", Basis::Bool),
            char_: add_std("char", Basis::Int8),
            uchar: add_std("unsigned char", Basis::Unt8),
            short_: add_std("short", Basis::Int16),
            ushort: add_std("unsigned short", Basis::Unt16),
            int_: add_std("int", Basis::Int32),
            uint: add_std("unsigned int", Basis::Unt32),
            long_: add_std("long", Basis::Int64),
            ulong: add_std("unsigned long", Basis::Unt64),
            longlong: add_std("long long", Basis::Int64),
            ulonglong: add_std("unsigned long long", Basis::Unt64),
            float_: add_std("float", Basis::Double),
            double_: add_std("double", Basis::Double),
        };

        Self {
            entities,
            scopes,
            root: ScopeId(0),
            std,
            using: Vec::new(),
            system_mask: false,
        }
    }

    // -----------------------------------------------------------------
    // Arena access
    // -----------------------------------------------------------------

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &EntityTable {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut EntityTable {
        &mut self.scopes[id.index()]
    }

    pub fn alloc_scope(
        &mut self,
        host: Option<EntityId>,
        name: impl Into<SmolStr>,
        parent: Option<ScopeId>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(EntityTable::new(host, name, parent));
        id
    }

    pub fn name_of(&self, id: EntityId) -> &str {
        &self.entity(id).base.name
    }

    /// Basis of a type entity, resolving typedefs.
    pub fn basis_of(&self, id: EntityId) -> Basis {
        match &self.entity(id).data {
            EntityData::Typedef { resolve, .. } => resolve.basis(self),
            _ => self.entity(id).own_basis(),
        }
    }

    // -----------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------

    /// Add an entity to a scope.
    ///
    /// Functions are keyed by extended name so overloads coexist. A
    /// duplicate of the same kind is idempotent with a warning; a
    /// duplicate of a different kind is E_DUPLICATE.
    pub fn add_entity(
        &mut self,
        scope: ScopeId,
        mut base: EntityBase,
        data: EntityData,
        diags: &mut DiagSink,
        file: &str,
        caller: &'static str,
    ) -> Result<EntityId, ErrorCode> {
        if base.name.is_empty() {
            diags.context(format!("{caller}: supplied entity is unnamed"));
            return Err(ErrorCode::Syntax);
        }

        let kind_is_fn = matches!(data, EntityData::Function(_));
        let key: SmolStr = if let EntityData::Function(f) = &data {
            if f.ext_name.is_empty() {
                diags.context(format!(
                    "{caller}: cannot add unprocessed function {} (no extended name)",
                    base.name
                ));
                return Err(ErrorCode::Syntax);
            }
            f.ext_name.clone()
        } else {
            base.name.clone()
        };

        // Function groups and sets are placeholders without scope;
        // everything else must carry one.
        let placeholder = matches!(data, EntityData::FuncGroup(_) | EntityData::FuncSet(_));
        if !placeholder && base.access == Access::Unknown {
            diags.context(format!(
                "{caller}: cannot add {} without an applied scope",
                base.name
            ));
            return Err(ErrorCode::Syntax);
        }

        if self.system_mask || base.name.starts_with('_') {
            base.attrs.set(Attrs::INTERNAL);
        }

        if let Some(existing) = self.scope(scope).get(&key) {
            let existing_kind = self.entity(existing).kind();
            let new_kind = kind_of(&data);
            if existing_kind == new_kind {
                diags.warning(
                    caller,
                    file,
                    0,
                    0,
                    format!(
                        "{} already defined in scope {}",
                        key,
                        self.scope(scope).name
                    ),
                );
                return Ok(existing);
            }
            diags.context(format!(
                "{caller}: {} already exists in scope {} as {}, cannot be reassigned to {}",
                key,
                self.scope(scope).name,
                existing_kind.as_str(),
                new_kind.as_str()
            ));
            return Err(ErrorCode::Duplicate);
        }

        let id = EntityId(self.entities.len() as u32);
        let ent = Entity { id, base, data };

        // Class and union tables chain back to the inserting scope.
        if let Some(owned) = ent.own_scope() {
            if matches!(ent.kind(), EntityKind::Class | EntityKind::Union | EntityKind::Namespace) {
                self.scopes[owned.index()].parent = Some(scope);
                self.scopes[owned.index()].host = Some(id);
            }
        }

        tracing::debug!(
            "scope {} accepts {} {} (id {})",
            self.scope(scope).name,
            ent.kind().as_str(),
            if kind_is_fn { &key } else { &ent.base.name },
            id.0
        );

        self.entities.push(ent);
        self.scope_mut(scope).entries.insert(key, id);
        Ok(id)
    }

    /// Allocate an entity without inserting it into any scope. Used
    /// for function arguments and local variables ahead of their
    /// installation into a function table.
    pub fn alloc_entity(&mut self, mut base: EntityBase, data: EntityData) -> EntityId {
        if self.system_mask || base.name.starts_with('_') {
            base.attrs.set(Attrs::INTERNAL);
        }
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity { id, base, data });
        id
    }

    /// Fully qualified name of a would-be entry of `scope`: the
    /// hosting frame's qualified name plus the new name.
    pub fn qualify_in(&self, scope: ScopeId, name: &str) -> SmolStr {
        match self.scope(scope).host {
            Some(h) => {
                let hq = &self.entity(h).base.fqname;
                if hq.is_empty() {
                    SmolStr::new(name)
                } else {
                    SmolStr::new(format!("{hq}::{name}"))
                }
            }
            None => SmolStr::new(name),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_types_preloaded() {
        let model = Model::new();
        assert_eq!(model.scope(model.root).get("int"), Some(model.std.int_));
        assert_eq!(model.basis_of(model.std.uchar), Basis::Unt8);
        assert_eq!(model.basis_of(model.std.double_), Basis::Double);
        assert_eq!(model.entities.len(), 14);
    }

    #[test]
    fn test_duplicate_same_kind_is_idempotent() {
        let mut model = Model::new();
        let mut diags = DiagSink::new();
        let mk = |name: &str| EntityBase {
            name: SmolStr::new(name),
            fqname: SmolStr::new(name),
            access: Access::Global,
            ..Default::default()
        };
        let table = model.alloc_scope(None, "E", None);
        let a = model
            .add_entity(
                model.root,
                mk("E"),
                EntityData::Namespace { table },
                &mut diags,
                "t.h",
                "test",
            )
            .unwrap();
        let table2 = model.alloc_scope(None, "E", None);
        let b = model
            .add_entity(
                model.root,
                mk("E"),
                EntityData::Namespace { table: table2 },
                &mut diags,
                "t.h",
                "test",
            )
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(model.scope(model.root).get("E"), Some(a));
    }

    #[test]
    fn test_duplicate_kind_conflict() {
        let mut model = Model::new();
        let mut diags = DiagSink::new();
        let base = EntityBase {
            name: SmolStr::new("int"),
            fqname: SmolStr::new("int"),
            access: Access::Global,
            ..Default::default()
        };
        let table = model.alloc_scope(None, "int", None);
        let r = model.add_entity(
            model.root,
            base,
            EntityData::Namespace { table },
            &mut diags,
            "t.h",
            "test",
        );
        assert_eq!(r, Err(ErrorCode::Duplicate));
    }

    #[test]
    fn test_system_mask_marks_internal() {
        let mut model = Model::new();
        let mut diags = DiagSink::new();
        model.system_mask = true;
        let base = EntityBase {
            name: SmolStr::new("size_t"),
            fqname: SmolStr::new("size_t"),
            access: Access::Global,
            ..Default::default()
        };
        let id = model
            .add_entity(
                model.root,
                base,
                EntityData::Typedef {
                    resolve: crate::semantic::Typlex::default(),
                    def_file: None,
                },
                &mut diags,
                "sys.sys",
                "test",
            )
            .unwrap();
        assert!(model.entity(id).base.attrs.has(Attrs::INTERNAL));
    }
}
