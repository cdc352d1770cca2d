//! Closed set of Java node kinds the clean-up rules reason about.
//!
//! Grammar kinds that no rule distinguishes collapse into [`NodeKind::Other`];
//! the raw grammar kind stays available on the node itself.

/// Tagged kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Compilation unit and declarations
    Program,
    PackageDeclaration,
    ImportDeclaration,
    ClassDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    RecordDeclaration,
    AnnotationTypeDeclaration,
    ClassBody,
    InterfaceBody,
    EnumBody,
    EnumBodyDeclarations,
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    ConstructorBody,
    ExplicitConstructorInvocation,
    FormalParameters,
    FormalParameter,
    SpreadParameter,
    CatchFormalParameter,
    Modifiers,
    VariableDeclarator,
    StaticInitializer,

    // Statements
    Block,
    LocalVariableDeclaration,
    ExpressionStatement,
    ReturnStatement,
    IfStatement,
    ForStatement,
    EnhancedForStatement,
    WhileStatement,
    DoStatement,
    ThrowStatement,
    BreakStatement,
    ContinueStatement,
    TryStatement,
    TryWithResourcesStatement,
    CatchClause,
    FinallyClause,
    SwitchExpression,
    SwitchBlock,
    SwitchBlockStatementGroup,
    LabeledStatement,
    SynchronizedStatement,
    YieldStatement,
    AssertStatement,
    LocalClassDeclaration,

    // Expressions
    ObjectCreation,
    MethodInvocation,
    FieldAccess,
    ArrayAccess,
    Identifier,
    This,
    Super,
    StringLiteral,
    IntegerLiteral,
    FloatLiteral,
    CharacterLiteral,
    True,
    False,
    NullLiteral,
    CastExpression,
    ParenthesizedExpression,
    BinaryExpression,
    UnaryExpression,
    UpdateExpression,
    AssignmentExpression,
    TernaryExpression,
    LambdaExpression,
    InstanceofExpression,
    ArrayCreation,
    ArrayInitializer,
    ClassLiteral,
    MethodReference,
    ArgumentList,

    // Types and names
    TypeIdentifier,
    ScopedTypeIdentifier,
    GenericType,
    TypeArguments,
    ArrayType,
    IntegralType,
    FloatingPointType,
    BooleanType,
    VoidType,
    ScopedIdentifier,
    Dimensions,

    // Trivia and recovery
    LineComment,
    BlockComment,
    Error,
    Other,
}

impl NodeKind {
    /// Map a tree-sitter-java grammar kind onto the closed kind set.
    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "program" => NodeKind::Program,
            "package_declaration" => NodeKind::PackageDeclaration,
            "import_declaration" => NodeKind::ImportDeclaration,
            "class_declaration" => NodeKind::ClassDeclaration,
            "interface_declaration" => NodeKind::InterfaceDeclaration,
            "enum_declaration" => NodeKind::EnumDeclaration,
            "record_declaration" => NodeKind::RecordDeclaration,
            "annotation_type_declaration" => NodeKind::AnnotationTypeDeclaration,
            "class_body" => NodeKind::ClassBody,
            "interface_body" => NodeKind::InterfaceBody,
            "enum_body" => NodeKind::EnumBody,
            "enum_body_declarations" => NodeKind::EnumBodyDeclarations,
            "field_declaration" | "constant_declaration" => NodeKind::FieldDeclaration,
            "method_declaration" => NodeKind::MethodDeclaration,
            "constructor_declaration" | "compact_constructor_declaration" => {
                NodeKind::ConstructorDeclaration
            }
            "constructor_body" => NodeKind::ConstructorBody,
            "explicit_constructor_invocation" => NodeKind::ExplicitConstructorInvocation,
            "formal_parameters" => NodeKind::FormalParameters,
            "formal_parameter" => NodeKind::FormalParameter,
            "spread_parameter" => NodeKind::SpreadParameter,
            "catch_formal_parameter" => NodeKind::CatchFormalParameter,
            "modifiers" => NodeKind::Modifiers,
            "variable_declarator" => NodeKind::VariableDeclarator,
            "static_initializer" => NodeKind::StaticInitializer,

            "block" => NodeKind::Block,
            "local_variable_declaration" => NodeKind::LocalVariableDeclaration,
            "expression_statement" => NodeKind::ExpressionStatement,
            "return_statement" => NodeKind::ReturnStatement,
            "if_statement" => NodeKind::IfStatement,
            "for_statement" => NodeKind::ForStatement,
            "enhanced_for_statement" => NodeKind::EnhancedForStatement,
            "while_statement" => NodeKind::WhileStatement,
            "do_statement" => NodeKind::DoStatement,
            "throw_statement" => NodeKind::ThrowStatement,
            "break_statement" => NodeKind::BreakStatement,
            "continue_statement" => NodeKind::ContinueStatement,
            "try_statement" => NodeKind::TryStatement,
            "try_with_resources_statement" => NodeKind::TryWithResourcesStatement,
            "catch_clause" => NodeKind::CatchClause,
            "finally_clause" => NodeKind::FinallyClause,
            "switch_expression" | "switch_statement" => NodeKind::SwitchExpression,
            "switch_block" => NodeKind::SwitchBlock,
            "switch_block_statement_group" => NodeKind::SwitchBlockStatementGroup,
            "labeled_statement" => NodeKind::LabeledStatement,
            "synchronized_statement" => NodeKind::SynchronizedStatement,
            "yield_statement" => NodeKind::YieldStatement,
            "assert_statement" => NodeKind::AssertStatement,
            "local_class_declaration" => NodeKind::LocalClassDeclaration,

            "object_creation_expression" => NodeKind::ObjectCreation,
            "method_invocation" => NodeKind::MethodInvocation,
            "field_access" => NodeKind::FieldAccess,
            "array_access" => NodeKind::ArrayAccess,
            "identifier" => NodeKind::Identifier,
            "this" => NodeKind::This,
            "super" => NodeKind::Super,
            "string_literal" => NodeKind::StringLiteral,
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => NodeKind::IntegerLiteral,
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                NodeKind::FloatLiteral
            }
            "character_literal" => NodeKind::CharacterLiteral,
            "true" => NodeKind::True,
            "false" => NodeKind::False,
            "null_literal" => NodeKind::NullLiteral,
            "cast_expression" => NodeKind::CastExpression,
            "parenthesized_expression" => NodeKind::ParenthesizedExpression,
            "binary_expression" => NodeKind::BinaryExpression,
            "unary_expression" => NodeKind::UnaryExpression,
            "update_expression" => NodeKind::UpdateExpression,
            "assignment_expression" => NodeKind::AssignmentExpression,
            "ternary_expression" => NodeKind::TernaryExpression,
            "lambda_expression" => NodeKind::LambdaExpression,
            "instanceof_expression" => NodeKind::InstanceofExpression,
            "array_creation_expression" => NodeKind::ArrayCreation,
            "array_initializer" => NodeKind::ArrayInitializer,
            "class_literal" => NodeKind::ClassLiteral,
            "method_reference" => NodeKind::MethodReference,
            "argument_list" => NodeKind::ArgumentList,

            "type_identifier" => NodeKind::TypeIdentifier,
            "scoped_type_identifier" => NodeKind::ScopedTypeIdentifier,
            "generic_type" => NodeKind::GenericType,
            "type_arguments" => NodeKind::TypeArguments,
            "array_type" => NodeKind::ArrayType,
            "integral_type" => NodeKind::IntegralType,
            "floating_point_type" => NodeKind::FloatingPointType,
            "boolean_type" => NodeKind::BooleanType,
            "void_type" => NodeKind::VoidType,
            "scoped_identifier" => NodeKind::ScopedIdentifier,
            "dimensions" => NodeKind::Dimensions,

            "line_comment" | "block_comment" | "comment" => {
                if kind == "block_comment" {
                    NodeKind::BlockComment
                } else {
                    NodeKind::LineComment
                }
            }
            "ERROR" => NodeKind::Error,
            _ => NodeKind::Other,
        }
    }

    pub fn is_comment(self) -> bool {
        matches!(self, NodeKind::LineComment | NodeKind::BlockComment)
    }

    /// Statements that may appear in a statement list.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Block
                | NodeKind::LocalVariableDeclaration
                | NodeKind::ExpressionStatement
                | NodeKind::ReturnStatement
                | NodeKind::IfStatement
                | NodeKind::ForStatement
                | NodeKind::EnhancedForStatement
                | NodeKind::WhileStatement
                | NodeKind::DoStatement
                | NodeKind::ThrowStatement
                | NodeKind::BreakStatement
                | NodeKind::ContinueStatement
                | NodeKind::TryStatement
                | NodeKind::TryWithResourcesStatement
                | NodeKind::SwitchExpression
                | NodeKind::LabeledStatement
                | NodeKind::SynchronizedStatement
                | NodeKind::YieldStatement
                | NodeKind::AssertStatement
                | NodeKind::LocalClassDeclaration
                | NodeKind::ExplicitConstructorInvocation
        )
    }

    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::ClassDeclaration
                | NodeKind::InterfaceDeclaration
                | NodeKind::EnumDeclaration
                | NodeKind::RecordDeclaration
                | NodeKind::AnnotationTypeDeclaration
        )
    }

    /// Members and top-level declarations.
    pub fn is_declaration(self) -> bool {
        self.is_type_declaration()
            || matches!(
                self,
                NodeKind::PackageDeclaration
                    | NodeKind::ImportDeclaration
                    | NodeKind::FieldDeclaration
                    | NodeKind::MethodDeclaration
                    | NodeKind::ConstructorDeclaration
                    | NodeKind::StaticInitializer
            )
    }

    /// Nodes that own comments: statements and declarations.
    pub fn is_comment_anchor(self) -> bool {
        self.is_statement() || self.is_declaration()
    }

    /// Bodies whose children form a statement list.
    pub fn is_statement_list(self) -> bool {
        matches!(
            self,
            NodeKind::Block | NodeKind::ConstructorBody | NodeKind::SwitchBlockStatementGroup
        )
    }

    /// Bodies whose children are member declarations.
    pub fn is_member_list(self) -> bool {
        matches!(
            self,
            NodeKind::ClassBody
                | NodeKind::InterfaceBody
                | NodeKind::EnumBody
                | NodeKind::EnumBodyDeclarations
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            NodeKind::StringLiteral
                | NodeKind::IntegerLiteral
                | NodeKind::FloatLiteral
                | NodeKind::CharacterLiteral
                | NodeKind::True
                | NodeKind::False
                | NodeKind::NullLiteral
        )
    }

    /// Statements after which control never falls through.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            NodeKind::ReturnStatement
                | NodeKind::ThrowStatement
                | NodeKind::BreakStatement
                | NodeKind::ContinueStatement
        )
    }

    /// Expressions that never need parentheses when spliced into another expression.
    pub fn is_primary(self) -> bool {
        self.is_literal()
            || matches!(
                self,
                NodeKind::Identifier
                    | NodeKind::This
                    | NodeKind::FieldAccess
                    | NodeKind::MethodInvocation
                    | NodeKind::ArrayAccess
                    | NodeKind::ParenthesizedExpression
                    | NodeKind::ObjectCreation
                    | NodeKind::ClassLiteral
                    | NodeKind::ArrayCreation
            )
    }

    /// Scopes that introduce a new declaring context for methods and fields.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
                | NodeKind::LambdaExpression
                | NodeKind::StaticInitializer
        )
    }
}
