//! Custom field directives: registry, per-request extraction, and stripping.
//!
//! Custom directives never reach the engine. Before execution the parsed
//! request is walked once to record every custom directive occurrence keyed
//! by its dotted response path (aliases respected, fragments followed), with
//! variable arguments resolved eagerly from the request variables. The
//! occurrences are then stripped from the document so engine validation only
//! sees the spec-defined `@skip`/`@include`, and the field pipeline looks its
//! occurrences up by path at resolve time.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use apollo_compiler::{
    ExecutableDocument, Name, Node, Schema, ast,
    executable::{Selection, SelectionSet},
    validation::Valid,
};

use graphbind_common::{GqlError, Json, JsonMap};

use crate::resolvers::OperationKind;

/// Spec-defined executable directives the engine itself interprets.
const ENGINE_DIRECTIVES: [&str; 2] = ["skip", "include"];

fn is_engine_directive(name: &str) -> bool {
    ENGINE_DIRECTIVES.contains(&name)
}

/// Handler for one named custom directive.
///
/// Invoked once per field call with the occurrence's arguments (dynamic
/// occurrences override static SDL ones of the same name) plus the field's
/// result type and raw field name. The returned map is exposed to the
/// resolver under the directive's name; an error aborts the field before
/// authorization runs.
pub trait Directive: Send + Sync {
    fn invoke(
        &self,
        args: &JsonMap,
        type_name: &str,
        field_name: &str,
    ) -> Result<JsonMap, GqlError>;
}

/// Name-keyed directive handlers. Names are stored without the `@` sigil;
/// re-registering a name replaces the handler. Wrapped fields look handlers
/// up live, so registration applies to already-bound schemas.
#[derive(Default)]
pub struct DirectiveRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Directive>>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, handler: impl Directive + 'static) {
        let name = name.into();
        let name = name.strip_prefix('@').unwrap_or(&name).to_string();
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        if handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(directive = %name, "directive handler replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Directive>> {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.get(name).cloned()
    }
}

/// One directive occurrence with its resolved arguments.
#[derive(Debug, Clone)]
pub struct DirectiveUse {
    pub name: String,
    pub args: JsonMap,
}

/// Custom directive occurrences of one request, keyed by dotted response
/// path. Attached to the engine request as data.
#[derive(Clone, Default)]
pub struct DirectiveOverlay(pub Arc<HashMap<String, Vec<DirectiveUse>>>);

impl DirectiveOverlay {
    pub fn at(&self, path: &str) -> &[DirectiveUse] {
        self.0.get(path).map(Vec::as_slice).unwrap_or_default()
    }
}

/// A request rewritten for the engine.
pub struct PreparedQuery {
    pub text: String,
    pub overlay: DirectiveOverlay,
    /// Kind of the selected operation, when the document parsed.
    pub operation: Option<OperationKind>,
}

/// Extract custom directives from the selected operation and strip them from
/// the whole document. A document that fails to parse passes through
/// untouched so the engine reports the syntax error itself.
pub fn prepare_query(
    schema: &Valid<Schema>,
    query: &str,
    operation_name: Option<&str>,
    variables: &JsonMap,
) -> PreparedQuery {
    let Ok(mut doc) = ExecutableDocument::parse(schema, query, "request.graphql") else {
        return PreparedQuery {
            text: query.to_string(),
            overlay: DirectiveOverlay::default(),
            operation: None,
        };
    };

    let mut overlay = HashMap::new();
    let mut operation = None;
    if let Ok(op) = doc.operations.get(operation_name) {
        operation = Some(operation_kind(op.operation_type));
        let mut visiting = Vec::new();
        collect(&doc, &op.selection_set, "", variables, &mut visiting, &mut overlay);
    }

    strip_document(&mut doc);

    PreparedQuery {
        text: doc.serialize().no_indent().to_string(),
        overlay: DirectiveOverlay(Arc::new(overlay)),
        operation,
    }
}

fn operation_kind(ty: ast::OperationType) -> OperationKind {
    match ty {
        ast::OperationType::Query => OperationKind::Query,
        ast::OperationType::Mutation => OperationKind::Mutation,
        ast::OperationType::Subscription => OperationKind::Subscription,
    }
}

fn collect(
    doc: &ExecutableDocument,
    set: &SelectionSet,
    prefix: &str,
    variables: &JsonMap,
    visiting: &mut Vec<Name>,
    out: &mut HashMap<String, Vec<DirectiveUse>>,
) {
    for selection in &set.selections {
        match selection {
            Selection::Field(field) => {
                let key = field.response_key();
                let path = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                let uses: Vec<DirectiveUse> = field
                    .directives
                    .iter()
                    .filter(|d| !is_engine_directive(&d.name))
                    .map(|d| DirectiveUse {
                        name: d.name.to_string(),
                        args: argument_map(&d.arguments, Some(variables)),
                    })
                    .collect();
                if !uses.is_empty() {
                    out.entry(path.clone()).or_default().extend(uses);
                }
                collect(doc, &field.selection_set, &path, variables, visiting, out);
            },
            Selection::FragmentSpread(spread) => {
                // Cycle guard for documents that never went through validation.
                if visiting.contains(&spread.fragment_name) {
                    continue;
                }
                if let Some(fragment) = doc.fragments.get(&spread.fragment_name) {
                    visiting.push(spread.fragment_name.clone());
                    collect(doc, &fragment.selection_set, prefix, variables, visiting, out);
                    visiting.pop();
                }
            },
            Selection::InlineFragment(fragment) => {
                collect(doc, &fragment.selection_set, prefix, variables, visiting, out);
            },
        }
    }
}

fn strip_document(doc: &mut ExecutableDocument) {
    if let Some(op) = doc.operations.anonymous.as_mut() {
        strip_selection_set(&mut op.make_mut().selection_set);
    }
    for (_, op) in doc.operations.named.iter_mut() {
        strip_selection_set(&mut op.make_mut().selection_set);
    }
    for (_, fragment) in doc.fragments.iter_mut() {
        strip_selection_set(&mut fragment.make_mut().selection_set);
    }
}

fn strip_selection_set(set: &mut SelectionSet) {
    for selection in set.selections.iter_mut() {
        match selection {
            Selection::Field(field) => {
                let field = field.make_mut();
                field.directives.0.retain(|d| is_engine_directive(&d.name));
                strip_selection_set(&mut field.selection_set);
            },
            Selection::FragmentSpread(spread) => {
                spread
                    .make_mut()
                    .directives
                    .0
                    .retain(|d| is_engine_directive(&d.name));
            },
            Selection::InlineFragment(fragment) => {
                let fragment = fragment.make_mut();
                fragment.directives.0.retain(|d| is_engine_directive(&d.name));
                strip_selection_set(&mut fragment.selection_set);
            },
        }
    }
}

/// Directive or field arguments as a JSON map. Variables resolve from the
/// request variables when given; a missing variable resolves to null.
pub fn argument_map(args: &[Node<ast::Argument>], variables: Option<&JsonMap>) -> JsonMap {
    args.iter()
        .map(|arg| (arg.name.to_string(), ast_value_to_json(&arg.value, variables)))
        .collect()
}

/// Convert a parsed GraphQL value into JSON. Enum values become strings;
/// numbers out of i64/f64 range degrade to null.
pub fn ast_value_to_json(value: &ast::Value, variables: Option<&JsonMap>) -> Json {
    match value {
        ast::Value::Null => Json::Null,
        ast::Value::Enum(name) => Json::String(name.to_string()),
        ast::Value::Variable(name) => variables
            .and_then(|vars| vars.get(name.as_str()))
            .cloned()
            .unwrap_or(Json::Null),
        ast::Value::String(s) => Json::String(s.clone()),
        ast::Value::Boolean(b) => Json::Bool(*b),
        ast::Value::Int(i) => i
            .as_str()
            .parse::<i64>()
            .ok()
            .map(|n| Json::Number(n.into()))
            .unwrap_or(Json::Null),
        ast::Value::Float(f) => f
            .try_to_f64()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        ast::Value::List(items) => Json::Array(
            items
                .iter()
                .map(|item| ast_value_to_json(item, variables))
                .collect(),
        ),
        ast::Value::Object(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), ast_value_to_json(value, variables)))
                .collect(),
        ),
    }
}
