//! Operation assembly.
//!
//! Builds one [`Operation`] per route from the handler signature:
//!
//! - the first non-ambient parameter is the request object. Each of its
//!   fields becomes a path parameter (declared `in = "path"`, or named like a
//!   template variable), a query parameter (declared `in = "query"`), or part
//!   of a single `body` parameter carrying the request type's schema;
//! - the last payload return is the schema of every response, `200` unless
//!   the route was registered with responses of its own;
//! - a concrete error return adds a `default` response.
//!
//! Routes that declare neither a payload nor an error are not API routes and
//! produce no operation.

use archytas_core::{
    ErrorClass, FieldInfo, ParamLocation, ReturnRole, RouteDefinition, TypeInfo,
};
use tracing::debug;

use crate::error::{DocsError, DocsResult};
use crate::openapi::{Items, Operation, Parameter, ParameterIn, Response, Schema, SchemaType};
use crate::registry::SchemaRegistry;

/// Metadata key under which a container stores a seed [`Operation`].
pub const OPERATION_KEY: &str = "archytas_docs.operation";

/// Derives operations from route signatures.
#[derive(Debug)]
pub struct OperationAssembler<'r> {
    registry: &'r mut SchemaRegistry,
}

impl<'r> OperationAssembler<'r> {
    /// Creates an assembler that records schemas in `registry`.
    pub fn new(registry: &'r mut SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Builds the operation for `route`, or `None` for non-API routes.
    pub fn assemble(&mut self, route: &RouteDefinition) -> DocsResult<Option<Operation>> {
        let method = route.method();
        let path = route.template().as_str();
        let signature = route.signature();

        let payload = signature.returns.iter().rev().find_map(|r| match r.role {
            ReturnRole::Payload(info) => Some(info),
            ReturnRole::Error(_) => None,
        });
        let error = signature.returns.iter().rev().find_map(|r| match r.role {
            ReturnRole::Error(class) => Some(class),
            ReturnRole::Payload(_) => None,
        });
        if payload.is_none() && error.is_none() {
            debug!(method, path, "route declares no payload or error, not documented");
            return Ok(None);
        }

        let mut op = seed_operation(route);
        if op.description.is_none() {
            op.description = Some(format!("{method} {path}"));
        }
        if op.responses.is_empty() {
            op.responses.insert(
                "200".to_string(),
                Response::new(format!("response of {method} {path}")),
            );
        }

        let request = signature
            .request_param()
            .and_then(|(_, arg)| arg.aggregate_type());
        if let Some(info) = request {
            self.add_parameters(&mut op, route, &info)?;
        }

        if let Some(info) = payload {
            let schema = self.registry.schema_for(info())?;
            for response in op.responses.values_mut() {
                response.schema = Some(schema.clone());
            }
        }

        if let Some(ErrorClass::Concrete(info)) = error {
            if !op.responses.contains_key("default") {
                let schema = self.registry.schema_for(info())?;
                op.responses.insert(
                    "default".to_string(),
                    Response {
                        description: format!("error response of {method} {path}"),
                        schema: Some(schema),
                    },
                );
            }
        }

        Ok(Some(op))
    }

    fn add_parameters(
        &mut self,
        op: &mut Operation,
        route: &RouteDefinition,
        info: &TypeInfo,
    ) -> DocsResult<()> {
        let mut path_params = Vec::new();
        let mut query_params = Vec::new();
        let mut needs_body = false;

        for field in parameter_fields(info) {
            let name = field.param_name();
            let in_path = field.api.location == Some(ParamLocation::Path)
                || route.template().has_parameter(name);
            if in_path {
                path_params.push(self.primitive_parameter(&field, ParameterIn::Path)?);
            } else if field.api.location == Some(ParamLocation::Query) {
                query_params.push(self.primitive_parameter(&field, ParameterIn::Query)?);
            } else {
                needs_body = true;
            }
        }

        path_params.sort_by(|a, b| a.name.cmp(&b.name));
        query_params.sort_by(|a, b| a.name.cmp(&b.name));
        op.parameters.extend(path_params);
        op.parameters.extend(query_params);

        if needs_body {
            let mut body = Parameter::new("body", ParameterIn::Body);
            body.required = true;
            body.schema = Some(self.registry.schema_for(*info)?);
            op.parameters.push(body);
        }
        Ok(())
    }

    fn primitive_parameter(
        &mut self,
        field: &FieldInfo,
        location: ParameterIn,
    ) -> DocsResult<Parameter> {
        let name = field.param_name();
        let schema = self.registry.field_schema(field)?;
        if schema.is_reference() || schema.schema_type == Some(SchemaType::Object) {
            return Err(DocsError::invalid_parameter(
                name,
                "path and query parameters must be primitives or arrays of primitives",
            ));
        }

        let mut param = Parameter::new(name, location);
        param.required = location == ParameterIn::Path || field.api.required;
        param.param_type = schema.schema_type;
        param.format = schema.format;
        param.description = schema.description;
        param.default = schema.default;
        param.minimum = schema.minimum;
        param.maximum = schema.maximum;
        param.min_length = schema.min_length;
        param.max_length = schema.max_length;
        param.pattern = schema.pattern;

        if param.param_type == Some(SchemaType::Array) {
            param.items = Some(array_items(name, schema.items.as_deref())?);
            if location == ParameterIn::Query {
                param.collection_format = Some("multi".to_string());
            }
        } else {
            param.enum_values = schema.enum_values;
        }
        Ok(param)
    }
}

fn seed_operation(route: &RouteDefinition) -> Operation {
    route
        .container()
        .value(OPERATION_KEY)
        .and_then(|value| value.downcast_ref::<Operation>())
        .cloned()
        .unwrap_or_default()
}

/// Items objects cannot hold references, so the element must be primitive.
fn array_items(name: &str, items: Option<&Schema>) -> DocsResult<Items> {
    match items {
        Some(items)
            if !items.is_reference()
                && items.schema_type.is_some()
                && items.schema_type != Some(SchemaType::Object)
                && items.schema_type != Some(SchemaType::Array) =>
        {
            Ok(Items {
                item_type: items.schema_type,
                format: items.format.clone(),
                items: None,
                enum_values: items.enum_values.clone(),
            })
        }
        _ => Err(DocsError::invalid_parameter(name, "items type is required")),
    }
}

/// Fields that can become parameters: flattened members are promoted,
/// private and skipped fields are dropped.
fn parameter_fields(info: &TypeInfo) -> Vec<FieldInfo> {
    let mut out = Vec::new();
    for field in info.fields() {
        if field.is_private() {
            continue;
        }
        if field.flatten {
            out.extend(parameter_fields(&field.type_info().resolve()));
            continue;
        }
        out.push(field);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use archytas_core::{BasicContainer, Context, HttpError, Reflect};
    use archytas_router::PathTemplate;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Default, Serialize, Deserialize, Reflect)]
    struct Paging {
        #[api(in = "query")]
        limit: i32,
        #[api(in = "query")]
        offset: i32,
    }

    #[derive(Debug, Default, Serialize, Deserialize, Reflect)]
    struct SearchRequest {
        #[api(in = "query", enum = "asc|desc", required)]
        order: String,
        #[serde(flatten)]
        paging: Paging,
        #[api(private)]
        trace: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize, Reflect)]
    struct BadQuery {
        #[api(in = "query")]
        nested: Vec<Paging>,
    }

    #[derive(Debug, Serialize, Reflect)]
    struct Hit {
        id: u64,
    }

    fn route<H, Args>(method: &str, template: &str, handler: H) -> RouteDefinition
    where
        H: archytas_core::Handler<Args>,
        Args: 'static,
    {
        RouteDefinition::new(
            method,
            PathTemplate::parse(template).unwrap(),
            Arc::new(BasicContainer::new(handler)),
        )
    }

    #[test]
    fn test_query_only_request_has_no_body() {
        let mut registry = SchemaRegistry::new();
        let route = route(
            "GET",
            "/api/search",
            |_req: Box<SearchRequest>| -> Result<Vec<Hit>, HttpError> { Ok(Vec::new()) },
        );
        let op = OperationAssembler::new(&mut registry)
            .assemble(&route)
            .unwrap()
            .unwrap();

        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["limit", "offset", "order"]);
        let order = op.parameter("order").unwrap();
        assert!(order.required);
        assert_eq!(order.enum_values, [serde_json::json!("asc"), serde_json::json!("desc")]);
        assert!(!op.parameter("limit").unwrap().required);

        let schema = op.responses["200"].schema.as_ref().unwrap();
        assert_eq!(schema.schema_type, Some(SchemaType::Array));
        assert_eq!(schema.items.as_ref().unwrap().reference_name(), Some("Hit"));
        assert!(!op.responses.contains_key("default"));
    }

    #[test]
    fn test_routes_without_returns_are_skipped() {
        let mut registry = SchemaRegistry::new();
        let route = route("GET", "/static", |_ctx: Context| ());
        let op = OperationAssembler::new(&mut registry).assemble(&route).unwrap();
        assert!(op.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_array_query_of_structs_fails() {
        let mut registry = SchemaRegistry::new();
        let route = route("GET", "/bad", |_req: Box<BadQuery>| -> Result<(), HttpError> {
            Ok(())
        });
        let err = OperationAssembler::new(&mut registry)
            .assemble(&route)
            .unwrap_err();
        assert!(matches!(err, DocsError::InvalidParameter { ref name, .. } if name == "nested"));
    }

    #[test]
    fn test_default_descriptions() {
        let mut registry = SchemaRegistry::new();
        let route = route("DELETE", "/api/todo/{id}", || -> Result<(), HttpError> {
            Ok(())
        });
        let op = OperationAssembler::new(&mut registry)
            .assemble(&route)
            .unwrap()
            .unwrap();
        assert_eq!(op.description.as_deref(), Some("DELETE /api/todo/{id}"));
        assert_eq!(
            op.responses["200"].description,
            "response of DELETE /api/todo/{id}"
        );
        assert!(op.responses["200"].schema.is_none());
        assert!(op.parameters.is_empty());
    }
}
