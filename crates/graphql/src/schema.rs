//! Engine schema construction and field resolution.
//!
//! `bind` walks the validated SDL type table and registers a mirror of every
//! type with the engine. Each object field gets a resolver: bound fields run
//! the full pipeline (directives, authorization, argument decode, provider
//! method); unbound fields fall through to plain property lookup on the
//! parent value. The result is an immutable [`BoundSchema`] snapshot the
//! transport publishes atomically.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use {
    apollo_compiler::{Schema as SdlSchema, ast, schema::ExtendedType, validation::Valid},
    async_graphql::{
        Variables,
        dynamic::{
            Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
            InterfaceField, Object, ResolverContext, Scalar, Schema as EngineSchema, TypeRef,
            Union,
        },
    },
};

use graphbind_common::{GqlError, Json, JsonMap};

use crate::{
    authorize::{AuthGate, AuthorizeInfo},
    context::RequestContext,
    directives::{
        DirectiveOverlay, DirectiveRegistry, DirectiveUse, argument_map, ast_value_to_json,
        prepare_query,
    },
    error::{denied, to_engine_error},
    naming::camel_to_snake,
    resolvers::{BindingKind, ExecutingOperation, Provider, ResolverFn, ResolverInfo},
    scalars::ScalarCodec,
    value::json_to_gql_value,
};

/// Schema binding failure. Always fatal for the (re)load that attempted it.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("schema has no query root type")]
    NoQueryRoot,

    #[error("engine schema construction failed: {0}")]
    Engine(String),
}

/// State every wrapped field shares: the SDL type table, the codec set
/// captured at bind time, and the live directive/authorization registries.
struct BindShared {
    schema: Arc<Valid<SdlSchema>>,
    scalars: HashMap<String, Arc<dyn ScalarCodec>>,
    directives: Arc<DirectiveRegistry>,
    auth: Arc<AuthGate>,
}

/// Everything one field needs at resolve time, fixed at bind time.
struct FieldSpec {
    parent_type: String,
    field_name: String,
    method_name: String,
    dst_type: String,
    kind: BindingKind,
    binding: Option<ResolverFn>,
    static_directives: Vec<DirectiveUse>,
    ty: ast::Type,
    args: Vec<(String, ast::Type)>,
    shared: Arc<BindShared>,
}

/// An immutable engine schema plus the SDL it was built from.
pub struct BoundSchema {
    pub engine: EngineSchema,
    pub schema: Arc<Valid<SdlSchema>>,
}

/// Build the engine schema for a validated SDL.
///
/// Providers and scalar codecs are the snapshots the caller took when the
/// (re)load started; directive handlers and the authorization predicate are
/// shared and looked up live on every field call.
pub fn bind(
    schema: Arc<Valid<SdlSchema>>,
    providers: &HashMap<String, Arc<Provider>>,
    scalars: HashMap<String, Arc<dyn ScalarCodec>>,
    directives: Arc<DirectiveRegistry>,
    auth: Arc<AuthGate>,
) -> Result<BoundSchema, BindError> {
    let query_root = schema
        .root_operation(ast::OperationType::Query)
        .ok_or(BindError::NoQueryRoot)?
        .to_string();
    let mutation_root = schema
        .root_operation(ast::OperationType::Mutation)
        .map(|name| name.to_string());

    let shared = Arc::new(BindShared {
        schema: schema.clone(),
        scalars,
        directives,
        auth,
    });

    let mut builder = EngineSchema::build(&query_root, mutation_root.as_deref(), None);

    for (name, ty) in &schema.types {
        if ty.is_built_in() || name.starts_with("__") {
            continue;
        }
        match ty {
            ExtendedType::Scalar(_) => {
                builder = builder.register(Scalar::new(name.to_string()));
            },
            ExtendedType::Enum(def) => {
                let mut engine_enum = Enum::new(name.to_string());
                for value in def.values.keys() {
                    engine_enum = engine_enum.item(value.as_str());
                }
                builder = builder.register(engine_enum);
            },
            ExtendedType::InputObject(def) => {
                let mut input = InputObject::new(name.to_string());
                for (field_name, field) in &def.fields {
                    input = input.field(input_value(
                        field_name.as_str(),
                        &field.ty,
                        field.default_value.as_deref(),
                    ));
                }
                builder = builder.register(input);
            },
            ExtendedType::Interface(def) => {
                let mut interface = Interface::new(name.to_string());
                for (field_name, field) in &def.fields {
                    let mut engine_field =
                        InterfaceField::new(field_name.as_str(), type_ref(&field.ty));
                    for arg in &field.arguments {
                        engine_field = engine_field.argument(input_value(
                            arg.name.as_str(),
                            &arg.ty,
                            arg.default_value.as_deref(),
                        ));
                    }
                    interface = interface.field(engine_field);
                }
                builder = builder.register(interface);
            },
            ExtendedType::Union(def) => {
                let mut engine_union = Union::new(name.to_string());
                for member in &def.members {
                    engine_union = engine_union.possible_type(member.as_str());
                }
                builder = builder.register(engine_union);
            },
            ExtendedType::Object(def) => {
                let kind = if name.as_str() == query_root {
                    BindingKind::Query
                } else if mutation_root.as_deref() == Some(name.as_str()) {
                    BindingKind::Mutation
                } else {
                    BindingKind::Nested
                };
                let mut object = Object::new(name.to_string());
                for interface in &def.implements_interfaces {
                    object = object.implement(interface.as_str());
                }
                for (field_name, field) in &def.fields {
                    object = object.field(make_field(
                        &shared,
                        providers,
                        name.as_str(),
                        field_name.as_str(),
                        field,
                        kind,
                    ));
                }
                builder = builder.register(object);
            },
        }
    }

    let engine = builder
        .finish()
        .map_err(|e| BindError::Engine(e.to_string()))?;
    tracing::info!(query_root = %query_root, "schema bound");
    Ok(BoundSchema { engine, schema })
}

fn type_ref(ty: &ast::Type) -> TypeRef {
    match ty {
        ast::Type::Named(name) => TypeRef::Named(Cow::Owned(name.to_string())),
        ast::Type::NonNullNamed(name) => {
            TypeRef::NonNull(Box::new(TypeRef::Named(Cow::Owned(name.to_string()))))
        },
        ast::Type::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
        ast::Type::NonNullList(inner) => {
            TypeRef::NonNull(Box::new(TypeRef::List(Box::new(type_ref(inner)))))
        },
    }
}

fn input_value(name: &str, ty: &ast::Type, default: Option<&ast::Value>) -> InputValue {
    let mut input = InputValue::new(name.to_string(), type_ref(ty));
    if let Some(default) = default {
        input = input.default_value(json_to_gql_value(&ast_value_to_json(default, None)));
    }
    input
}

fn make_field(
    shared: &Arc<BindShared>,
    providers: &HashMap<String, Arc<Provider>>,
    parent_type: &str,
    field_name: &str,
    def: &ast::FieldDefinition,
    kind: BindingKind,
) -> Field {
    let method_name = camel_to_snake(field_name);
    let dst_type = def.ty.inner_named_type().to_string();

    // Own-type providers win over destination-type providers.
    let binding = providers
        .get(parent_type)
        .and_then(|p| p.resolver(&method_name))
        .or_else(|| providers.get(&dst_type).and_then(|p| p.resolver(&method_name)));

    let static_directives: Vec<DirectiveUse> = def
        .directives
        .iter()
        .map(|d| DirectiveUse {
            name: d.name.to_string(),
            args: argument_map(&d.arguments, None),
        })
        .collect();

    let args: Vec<(String, ast::Type)> = def
        .arguments
        .iter()
        .map(|arg| (arg.name.to_string(), (*arg.ty).clone()))
        .collect();

    if binding.is_some() {
        tracing::debug!(
            field = %format!("{parent_type}.{field_name}"),
            method = %method_name,
            "field bound"
        );
    }

    let spec = Arc::new(FieldSpec {
        parent_type: parent_type.to_string(),
        field_name: field_name.to_string(),
        method_name,
        dst_type,
        kind,
        binding,
        static_directives,
        ty: def.ty.clone(),
        args,
        shared: shared.clone(),
    });

    let mut field = Field::new(field_name.to_string(), type_ref(&def.ty), move |ctx| {
        let spec = spec.clone();
        FieldFuture::new(async move { resolve_field(spec, ctx).await })
    });
    for arg in &def.arguments {
        field = field.argument(input_value(
            arg.name.as_str(),
            &arg.ty,
            arg.default_value.as_deref(),
        ));
    }
    field
}

async fn resolve_field<'a>(
    spec: Arc<FieldSpec>,
    ctx: ResolverContext<'a>,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    let shared = spec.shared.clone();

    let Some(binding) = spec.binding.clone() else {
        // Unbound field: plain property lookup on the parent value, no
        // interception of any kind.
        let value = parent_json(&ctx)
            .and_then(|parent| parent.get(&spec.field_name).cloned())
            .unwrap_or(Json::Null);
        return to_field_value(value, &spec.ty, &shared).map_err(to_engine_error);
    };

    let request = ctx
        .ctx
        .data_opt::<Arc<RequestContext>>()
        .cloned()
        .unwrap_or_else(|| Arc::new(RequestContext::detached()));
    let operation = ctx
        .ctx
        .data_opt::<ExecutingOperation>()
        .map(|op| op.0)
        .unwrap_or_else(|| spec.kind.operation());

    // Static occurrences first, in SDL order; a dynamic occurrence of the
    // same name replaces the static arguments.
    let mut occurrences: Vec<(String, JsonMap)> = spec
        .static_directives
        .iter()
        .map(|d| (d.name.clone(), d.args.clone()))
        .collect();
    if let Some(overlay) = ctx.ctx.data_opt::<DirectiveOverlay>() {
        let path = response_path(&ctx);
        for dynamic_use in overlay.at(&path) {
            match occurrences
                .iter_mut()
                .find(|(name, _)| *name == dynamic_use.name)
            {
                Some(slot) => slot.1 = dynamic_use.args.clone(),
                None => occurrences.push((dynamic_use.name.clone(), dynamic_use.args.clone())),
            }
        }
    }

    let mut directive_results: HashMap<String, Json> = HashMap::new();
    for (name, directive_args) in &occurrences {
        if let Some(handler) = shared.directives.get(name) {
            let out = handler
                .invoke(directive_args, &spec.dst_type, &spec.field_name)
                .map_err(to_engine_error)?;
            directive_results.insert(name.clone(), Json::Object(out));
        }
    }

    if let Some(predicate) = shared.auth.predicate() {
        let info = AuthorizeInfo {
            operation,
            src_type: spec.parent_type.clone(),
            dst_type: spec.dst_type.clone(),
            resolver: spec.method_name.clone(),
            session_id: request.session_id().map(str::to_string),
        };
        if !predicate(&info) {
            tracing::debug!(
                src_type = %info.src_type,
                dst_type = %info.dst_type,
                resolver = %info.resolver,
                "field call denied"
            );
            return Err(to_engine_error(denied(&spec.dst_type, &spec.field_name)));
        }
    }

    let mut args = JsonMap::new();
    for (name, value) in ctx.args.iter() {
        let json = value.deserialize::<Json>()?;
        let decoded = match spec.args.iter().find(|(n, _)| n.as_str() == name.as_str()) {
            Some((_, ty)) => decode_value(json, ty, &shared).map_err(to_engine_error)?,
            None => json,
        };
        args.insert(camel_to_snake(name.as_str()), decoded);
    }

    let info = ResolverInfo {
        operation,
        resolver: spec.method_name.clone(),
        args,
        parent: parent_json(&ctx),
        type_name: spec.dst_type.clone(),
        parent_type_name: spec.parent_type.clone(),
        session_id: request.session_id().map(str::to_string),
        directives: directive_results,
        context: request,
        field_name: spec.field_name.clone(),
    };

    let result = binding(info).await.map_err(to_engine_error)?;
    to_field_value(result, &spec.ty, &shared).map_err(to_engine_error)
}

fn parent_json(ctx: &ResolverContext<'_>) -> Option<Json> {
    ctx.parent_value.downcast_ref::<Json>().cloned()
}

/// Dotted response path of the current field, list indices skipped, so all
/// elements of a list share their field's directive occurrences.
fn response_path(ctx: &ResolverContext<'_>) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut node = ctx.ctx.path_node.as_ref();
    while let Some(current) = node {
        if let async_graphql::QueryPathSegment::Name(name) = current.segment {
            segments.push(name);
        }
        node = current.parent;
    }
    segments.reverse();
    segments.join(".")
}

/// Apply scalar codecs to an argument value, recursing through lists and
/// input objects by declared type. Null short-circuits; nested input-object
/// keys keep their declared spelling.
fn decode_value(value: Json, ty: &ast::Type, shared: &BindShared) -> Result<Json, GqlError> {
    if value.is_null() {
        return Ok(value);
    }
    match ty {
        ast::Type::List(inner) | ast::Type::NonNullList(inner) => match value {
            Json::Array(items) => {
                let decoded: Result<Vec<Json>, GqlError> = items
                    .into_iter()
                    .map(|item| decode_value(item, inner, shared))
                    .collect();
                Ok(Json::Array(decoded?))
            },
            single => decode_value(single, inner, shared),
        },
        ast::Type::Named(name) | ast::Type::NonNullNamed(name) => {
            match shared.schema.types.get(name.as_str()) {
                Some(ExtendedType::Scalar(_)) => match shared.scalars.get(name.as_str()) {
                    Some(codec) => codec.decode(&value),
                    None => Ok(value),
                },
                Some(ExtendedType::InputObject(def)) => {
                    let Json::Object(map) = value else {
                        return Ok(value);
                    };
                    let mut out = JsonMap::new();
                    for (key, field_value) in map {
                        let decoded = match def.fields.get(key.as_str()) {
                            Some(field) => decode_value(field_value, &field.ty, shared)?,
                            None => field_value,
                        };
                        out.insert(key, decoded);
                    }
                    Ok(Json::Object(out))
                },
                _ => Ok(value),
            }
        },
    }
}

/// Convert resolver output into an engine value by declared type: scalars
/// encode through their codec, objects stay JSON for nested resolution, and
/// abstract types pick their concrete type from a `__typename` property.
fn to_field_value(
    value: Json,
    ty: &ast::Type,
    shared: &BindShared,
) -> Result<Option<FieldValue<'static>>, GqlError> {
    if value.is_null() {
        return Ok(None);
    }
    match ty {
        ast::Type::List(inner) | ast::Type::NonNullList(inner) => {
            let items = match value {
                Json::Array(items) => items,
                single => vec![single],
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_field_value(item, inner, shared)?.unwrap_or(FieldValue::NULL));
            }
            Ok(Some(FieldValue::list(out)))
        },
        ast::Type::Named(name) | ast::Type::NonNullNamed(name) => {
            named_field_value(value, name.as_str(), shared)
        },
    }
}

fn named_field_value(
    value: Json,
    name: &str,
    shared: &BindShared,
) -> Result<Option<FieldValue<'static>>, GqlError> {
    match shared.schema.types.get(name) {
        Some(ExtendedType::Scalar(_)) | None => {
            let encoded = match shared.scalars.get(name) {
                Some(codec) => codec.encode(&value)?,
                None => value,
            };
            Ok(Some(FieldValue::value(json_to_gql_value(&encoded))))
        },
        Some(ExtendedType::Enum(_)) => match value {
            Json::String(s) => Ok(Some(FieldValue::value(async_graphql::Value::Enum(
                async_graphql::Name::new(s),
            )))),
            other => Err(GqlError::fatal(format!(
                "expected enum value for {name}, got {other}"
            ))),
        },
        Some(ExtendedType::Object(_) | ExtendedType::InputObject(_)) => {
            Ok(Some(FieldValue::owned_any(value)))
        },
        Some(ExtendedType::Interface(_) | ExtendedType::Union(_)) => {
            let type_name = value
                .get("__typename")
                .and_then(Json::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    GqlError::fatal(format!(
                        "abstract type {name} requires a __typename property"
                    ))
                })?;
            Ok(Some(FieldValue::owned_any(value).with_type(type_name)))
        },
    }
}

/// One GraphQL request for [`execute`].
pub struct ExecuteRequest<'a> {
    pub query: &'a str,
    pub operation_name: Option<&'a str>,
    pub variables: Option<Json>,
}

/// Preprocess a request (custom directive extraction and stripping) and run
/// it through the bound engine schema.
pub async fn execute(
    bound: &BoundSchema,
    request: ExecuteRequest<'_>,
    ctx: Arc<RequestContext>,
) -> async_graphql::Response {
    let var_map = match &request.variables {
        Some(Json::Object(map)) => map.clone(),
        _ => JsonMap::new(),
    };
    let prepared = prepare_query(&bound.schema, request.query, request.operation_name, &var_map);

    let mut engine_request = async_graphql::Request::new(prepared.text)
        .data(ctx)
        .data(prepared.overlay);
    if let Some(kind) = prepared.operation {
        engine_request = engine_request.data(ExecutingOperation(kind));
    }
    if let Some(name) = request.operation_name {
        engine_request = engine_request.operation_name(name);
    }
    if let Some(variables) = request.variables {
        engine_request = engine_request.variables(Variables::from_json(variables));
    }

    bound.engine.execute(engine_request).await
}
