//! End-to-end tests: TypeScript sources on disk through to request validation.

use std::fs;
use std::path::Path;

use apigen_compiler::ir::{AdditionalProperties, PrimitiveKind, SchemaNode};
use apigen_compiler::{
    ApiIR, Compiler, CompilerConfig, CompilerError, ExtrasPolicy, HttpVerb, RawRequest, SecurityCombination,
    TypedValue, ValidationConfig,
};
use serde_json::json;
use tempfile::TempDir;

const USER: &str = r#"
/** A registered user. */
export interface User {
    /** @isInt */
    id: number;
    name: string;
    nick?: string;
    role: Role;
}

export type Role = "admin" | "member";

export interface Admin extends User {
    level: number;
}

export interface TreeNode {
    label: string;
    children: TreeNode[];
}
"#;

const PAGED: &str = r#"
export interface Paged<T> {
    items: T[];
    total: number;
}
"#;

const CONTROLLER: &str = r#"
import { User, Admin, TreeNode } from "../models/user";
import { Paged } from "../models/paged";

@Route("users")
@Tags("Users")
export class UsersController {
    /**
     * Fetches one user.
     * @isInt id
     */
    @Get("{id}")
    public async getUser(id: number, @Query() verbose?: boolean): Promise<User> {
        return null as any;
    }

    /** @isInt limit */
    @Get()
    @Security("api_key")
    @Security("oauth", ["read"])
    public list(@Query() limit: number, @Query() role?: "admin" | "member"): Promise<Paged<User>> {
        return null as any;
    }

    @Post()
    @SuccessResponse(201, "Created")
    public create(@Body() user: User): Promise<Admin> {
        return null as any;
    }

    @Get("tree")
    public tree(): TreeNode {
        return null as any;
    }

    @Delete("{id}")
    public remove(@Path() id: string): Promise<void> {
        return;
    }
}
"#;

fn write(root: &Path, module: &str, text: &str) {
    let path = root.join(format!("{}.ts", module));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "models/user", USER);
    write(dir.path(), "models/paged", PAGED);
    write(dir.path(), "controllers/users", CONTROLLER);
    dir
}

fn compile_with(dir: &TempDir, security: SecurityCombination) -> Result<ApiIR, CompilerError> {
    Compiler::new(CompilerConfig {
        source_dir: dir.path().to_path_buf(),
        security,
        ..CompilerConfig::default()
    })
    .compile()
}

fn compile(dir: &TempDir) -> ApiIR {
    compile_with(dir, SecurityCombination::AnyOf).unwrap()
}

#[test]
fn test_operations_are_extracted() {
    let dir = project();
    let api = compile(&dir);

    assert_eq!(api.operations.len(), 5);
    let get = api.operation(HttpVerb::Get, "/users/{id}").unwrap();
    assert_eq!(get.returns, Some(SchemaNode::reference("User")));
    assert_eq!(get.tags, vec!["Users".to_string()]);
    assert_eq!(get.description.as_deref(), Some("Fetches one user."));

    let create = api.operation(HttpVerb::Post, "/users").unwrap();
    assert_eq!(create.success_status, 201);

    let remove = api.operation(HttpVerb::Delete, "/users/{id}").unwrap();
    assert_eq!(remove.returns, None);
    assert_eq!(remove.success_status, 204);
}

#[test]
fn test_path_parameter_validation() {
    let dir = project();
    let api = compile(&dir);
    let config = CompilerConfig::default().validation;
    let op = api.operation(HttpVerb::Get, "/users/{id}").unwrap();

    let outcome = api.validate(op, &RawRequest::new().with_path_param("id", "7"), &config);
    assert!(outcome.is_valid());
    assert_eq!(outcome.args.get("id"), Some(&TypedValue::Integer(7)));
    assert!(!outcome.args.contains_key("verbose"));

    let outcome = api.validate(op, &RawRequest::new().with_path_param("id", "abc"), &config);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors.get("id").unwrap().message, "not a valid integer");
}

#[test]
fn test_query_errors_are_collected() {
    let dir = project();
    let api = compile(&dir);
    let config = CompilerConfig::default().validation;
    let op = api.operation(HttpVerb::Get, "/users").unwrap();

    let request = RawRequest::from_query_string("limit=ten&role=owner").unwrap();
    let outcome = api.validate(op, &request, &config);
    assert_eq!(outcome.errors.keys().collect::<Vec<_>>(), vec!["limit", "role"]);
    assert_eq!(outcome.errors.get("limit").unwrap().message, "not a valid integer");

    let request = RawRequest::from_query_string("limit=5&role=admin").unwrap();
    let args = api.validate(op, &request, &config).into_result().unwrap();
    assert_eq!(args.get("limit"), Some(&TypedValue::Integer(5)));
    assert_eq!(args.get("role"), Some(&TypedValue::String("admin".into())));
}

#[test]
fn test_body_validation_follows_definitions() {
    let dir = project();
    let api = compile(&dir);
    let config = CompilerConfig::default().validation;
    let op = api.operation(HttpVerb::Post, "/users").unwrap();

    let ok = RawRequest::new().with_body(json!({ "id": 1, "name": "Ada", "role": "member" }));
    assert!(api.validate(op, &ok, &config).is_valid());

    let bad = RawRequest::new().with_body(json!({ "id": 1.5, "role": "owner" }));
    let outcome = api.validate(op, &bad, &config);
    assert_eq!(outcome.errors.keys().collect::<Vec<_>>(), vec!["user.id", "user.name", "user.role"]);
}

#[test]
fn test_one_definition_per_type() {
    let dir = project();
    let api = compile(&dir);

    let names: Vec<&str> = api.definitions.names().collect();
    assert_eq!(names.iter().filter(|n| **n == "User").count(), 1);
    assert!(api.definitions.contains("Role"));
    assert_eq!(api.definition("User").unwrap().description.as_deref(), Some("A registered user."));

    let again = compile(&dir);
    assert_eq!(api, again);
    assert_eq!(api.to_json().unwrap(), again.to_json().unwrap());
}

#[test]
fn test_generic_instantiation_is_named() {
    let dir = project();
    let api = compile(&dir);

    let op = api.operation(HttpVerb::Get, "/users").unwrap();
    assert_eq!(op.returns, Some(SchemaNode::reference("Paged_User_")));

    let SchemaNode::Object(paged) = &api.definition("Paged_User_").unwrap().schema else {
        panic!("Paged<User> should be an object");
    };
    assert_eq!(paged.properties["items"].schema, SchemaNode::array(SchemaNode::reference("User")));
    assert_eq!(paged.properties["total"].schema, SchemaNode::primitive(PrimitiveKind::Number));
}

#[test]
fn test_self_reference_terminates() {
    let dir = project();
    let api = compile(&dir);

    let SchemaNode::Object(node) = &api.definition("TreeNode").unwrap().schema else {
        panic!("TreeNode should be an object");
    };
    assert_eq!(
        node.properties["children"].schema,
        SchemaNode::array(SchemaNode::reference("TreeNode"))
    );
}

#[test]
fn test_inherited_members_are_flattened() {
    let dir = project();
    let api = compile(&dir);

    let SchemaNode::Object(admin) = &api.definition("Admin").unwrap().schema else {
        panic!("Admin should be an object");
    };
    let names: Vec<&str> = admin.properties.keys().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "nick", "role", "level"]);
    assert!(!admin.properties["nick"].required);
    assert_eq!(admin.additional_properties, AdditionalProperties::Implicit);
}

#[test]
fn test_security_combination() {
    let dir = project();

    let api = compile_with(&dir, SecurityCombination::AnyOf).unwrap();
    let op = api.operation(HttpVerb::Get, "/users").unwrap();
    assert_eq!(op.security.len(), 2);
    assert_eq!(op.security[1].schemes["oauth"], vec!["read".to_string()]);

    let api = compile_with(&dir, SecurityCombination::AllOf).unwrap();
    let op = api.operation(HttpVerb::Get, "/users").unwrap();
    assert_eq!(op.security.len(), 1);
    let schemes: Vec<&str> = op.security[0].schemes.keys().map(|k| k.as_str()).collect();
    assert_eq!(schemes, vec!["api_key", "oauth"]);
}

#[test]
fn test_unknown_decorator_fails_the_run() {
    let dir = project();
    write(
        dir.path(),
        "controllers/health",
        r#"
@Route("health")
export class HealthController {
    @Get() @Cached() public check(): string { return "ok"; }
}
"#,
    );

    let err = compile_with(&dir, SecurityCombination::AnyOf).unwrap_err();
    assert!(matches!(err, CompilerError::UnrecognizedAnnotation { ref name, .. } if name == "Cached"));
}

#[test]
fn test_duplicate_route_fails_the_run() {
    let dir = project();
    write(
        dir.path(),
        "controllers/people",
        r#"
@Route("users")
export class PeopleController {
    @Get("{userId}") public one(userId: string): string { return ""; }
}
"#,
    );

    let err = compile_with(&dir, SecurityCombination::AnyOf).unwrap_err();
    assert!(matches!(err, CompilerError::DuplicateOperation { .. }));
}

#[test]
fn test_unresolvable_type_fails_the_run() {
    let compiler = Compiler::new(CompilerConfig::default());
    let err = compiler
        .compile_sources(&[(
            "controllers/orders",
            r#"
@Route("orders")
export class OrdersController {
    @Get() public list(): Order[] { return []; }
}
"#,
        )])
        .unwrap_err();
    assert!(matches!(err, CompilerError::UnresolvableReference { ref name, .. } if name == "Order"));
}

#[test]
fn test_decorated_non_operation_members_fail_the_run() {
    let compiler = Compiler::new(CompilerConfig::default());

    let err = compiler
        .compile_sources(&[(
            "controllers/x",
            r#"
@Route("x")
export class XController {
    @Get("secret") private secret(): string { return ""; }
    @Get() public list(): string { return ""; }
}
"#,
        )])
        .unwrap_err();
    assert!(matches!(err, CompilerError::MisplacedAnnotation { ref name, .. } if name == "Get"));

    let err = compiler
        .compile_sources(&[(
            "controllers/x",
            r#"
@Route("x")
export class XController {
    @Get("ghost") ghost: string;
    @Get() public list(): string { return ""; }
}
"#,
        )])
        .unwrap_err();
    assert!(matches!(err, CompilerError::MisplacedAnnotation { ref target, .. } if target == "property"));
}

#[test]
fn test_implicit_body_is_validated_as_an_object() {
    let compiler = Compiler::new(CompilerConfig::default());
    let api = compiler
        .compile_sources(&[(
            "controllers/notes",
            r#"
@Route("notes")
export class NotesController {
    @Post()
    public create(title: string, pinned?: boolean): void {}
}
"#,
        )])
        .unwrap();
    let op = api.operation(HttpVerb::Post, "/notes").unwrap();

    let reject = ValidationConfig {
        additional_properties: ExtrasPolicy::Reject,
        ..ValidationConfig::default()
    };
    let request = RawRequest::new().with_body(json!({ "title": "a", "admin": true }));
    let outcome = api.validate(op, &request, &reject);
    assert_eq!(outcome.errors.keys().collect::<Vec<_>>(), vec!["admin"]);

    let outcome = api.validate(op, &RawRequest::new().with_body(json!([1, 2])), &reject);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors.get("body").unwrap().message, "not a valid object");

    let request = RawRequest::new().with_body(json!({ "title": "a", "pinned": true }));
    let args = api.validate(op, &request, &reject).into_result().unwrap();
    assert_eq!(args.get("pinned"), Some(&TypedValue::Boolean(true)));
}
