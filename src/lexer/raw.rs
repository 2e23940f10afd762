//! Logos-based raw tokenizer.
//!
//! Maximal munch over the explicit multi-character operator set gives
//! the longest-legal-prefix behavior required for runs of operator
//! characters: `*>::` lexes as `*`, `>`, `::` and `>>=` as one token.
//! `::~` is its own kind so a destructor reference survives as a single
//! token.

use logos::Logos;

use crate::token::TokenKind;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexInt,

    #[regex(r"0[0-7]+", priority = 10)]
    OctInt,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    Float,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    CharLit,

    // =========================================================================
    // DIRECTIVES
    // =========================================================================
    #[token("#if")]
    HashIf,
    #[token("#ifdef")]
    HashIfdef,
    #[token("#ifndef")]
    HashIfndef,
    #[token("#else")]
    HashElse,
    #[token("#elseif")]
    #[token("#elif")]
    HashElseIf,
    #[token("#endif")]
    HashEndif,
    #[token("#define")]
    HashDefine,
    #[token("#undef")]
    HashUndef,
    #[token("#include")]
    HashInclude,

    // =========================================================================
    // MULTI-CHARACTER OPERATORS (longest match wins)
    // =========================================================================
    #[token("::~")]
    ScopeTilde,
    #[token("::")]
    Scope,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,
    #[token("***")]
    Indirect3,
    #[token("**")]
    Indirect2,
    #[token("++")]
    Incr,
    #[token("--")]
    Decr,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    MultEq,
    #[token("/=")]
    DivEq,
    #[token("%=")]
    RemEq,
    #[token("<<=")]
    LshiftEq,
    #[token(">>=")]
    RshiftEq,
    #[token("<<")]
    Lshift,
    #[token(">>")]
    Rshift,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    MoreEq,
    #[token("==")]
    TestEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    CondAnd,
    #[token("||")]
    CondOr,
    #[token("&=")]
    AndEq,
    #[token("|=")]
    OrEq,
    #[token("^=")]
    XorEq,
    #[token("~=")]
    InvertEq,

    // =========================================================================
    // SINGLE-CHARACTER TOKENS
    // =========================================================================
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("\\")]
    Backslash,
    #[token(":")]
    Colon,
    #[token("?")]
    Query,
    #[token(".")]
    Period,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Mult,
    #[token("/")]
    Div,
    #[token("%")]
    Rem,
    #[token("<")]
    Less,
    #[token(">")]
    More,
    #[token("=")]
    Assign,
    #[token("^")]
    BitXor,
    #[token("&")]
    BitAnd,
    #[token("|")]
    BitOr,
    #[token("!")]
    Not,
    #[token("~")]
    Invert,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("class")]
    ClassKw,
    #[token("struct")]
    StructKw,
    #[token("union")]
    UnionKw,
    #[token("enum")]
    EnumKw,
    #[token("typedef")]
    TypedefKw,
    #[token("template")]
    TemplateKw,
    #[token("namespace")]
    NamespaceKw,
    #[token("using")]
    UsingKw,
    #[token("inline")]
    InlineKw,
    #[token("static")]
    StaticKw,
    #[token("extern")]
    ExternKw,
    #[token("friend")]
    FriendKw,
    #[token("virtual")]
    VirtualKw,
    #[token("mutable")]
    MutableKw,
    #[token("const")]
    ConstKw,
    #[token("register")]
    RegisterKw,
    #[token("public")]
    PublicKw,
    #[token("private")]
    PrivateKw,
    #[token("protected")]
    ProtectedKw,
    #[token("operator")]
    OperatorKw,
    #[token("void")]
    VoidKw,
    #[token("char")]
    CharKw,
    #[token("short")]
    ShortKw,
    #[token("int")]
    IntKw,
    #[token("long")]
    LongKw,
    #[token("unsigned")]
    UnsignedKw,
    #[token("if")]
    IfKw,
    #[token("else")]
    ElseKw,
    #[token("switch")]
    SwitchKw,
    #[token("case")]
    CaseKw,
    #[token("default")]
    DefaultKw,
    #[token("for")]
    ForKw,
    #[token("do")]
    DoKw,
    #[token("while")]
    WhileKw,
    #[token("break")]
    BreakKw,
    #[token("continue")]
    ContinueKw,
    #[token("goto")]
    GotoKw,
    #[token("return")]
    ReturnKw,
    #[token("new")]
    NewKw,
    #[token("delete")]
    DeleteKw,
    #[token("this")]
    ThisKw,
    #[token("sizeof")]
    SizeofKw,
    #[token("dynamic_cast")]
    DynCastKw,
    #[token("true")]
    TrueKw,
    #[token("false")]
    FalseKw,
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> Self {
        use RawToken::*;
        match raw {
            Whitespace => TokenKind::Unknown,
            LineComment | BlockComment => TokenKind::Comment,

            Ident => TokenKind::Word,
            HexInt => TokenKind::Hex,
            OctInt => TokenKind::Octal,
            Float => TokenKind::StdForm,
            Integer => TokenKind::Integer,
            Str => TokenKind::StrLit,
            CharLit => TokenKind::CharLit,

            HashIf => TokenKind::HashIf,
            HashIfdef => TokenKind::HashIfdef,
            HashIfndef => TokenKind::HashIfndef,
            HashElse => TokenKind::HashElse,
            HashElseIf => TokenKind::HashElseIf,
            HashEndif => TokenKind::HashEndif,
            HashDefine => TokenKind::HashDefine,
            HashUndef => TokenKind::HashUndef,
            HashInclude => TokenKind::HashInclude,

            ScopeTilde => TokenKind::ScopeTilde,
            Scope => TokenKind::Scope,
            Arrow => TokenKind::Arrow,
            Ellipsis => TokenKind::Ellipsis,
            Indirect3 | Indirect2 => TokenKind::Indirect,
            Incr => TokenKind::Incr,
            Decr => TokenKind::Decr,
            PlusEq => TokenKind::PlusEq,
            MinusEq => TokenKind::MinusEq,
            MultEq => TokenKind::MultEq,
            DivEq => TokenKind::DivEq,
            RemEq => TokenKind::RemEq,
            LshiftEq => TokenKind::LshiftEq,
            RshiftEq => TokenKind::RshiftEq,
            Lshift => TokenKind::Lshift,
            Rshift => TokenKind::Rshift,
            LessEq => TokenKind::LessEq,
            MoreEq => TokenKind::MoreEq,
            TestEq => TokenKind::TestEq,
            NotEq => TokenKind::NotEq,
            CondAnd => TokenKind::CondAnd,
            CondOr => TokenKind::CondOr,
            AndEq => TokenKind::AndEq,
            OrEq => TokenKind::OrEq,
            XorEq => TokenKind::XorEq,
            InvertEq => TokenKind::InvertEq,

            BraceOpen => TokenKind::BraceOpen,
            BraceClose => TokenKind::BraceClose,
            BracketOpen => TokenKind::BracketOpen,
            BracketClose => TokenKind::BracketClose,
            ParenOpen => TokenKind::ParenOpen,
            ParenClose => TokenKind::ParenClose,
            Comma => TokenKind::Comma,
            Semicolon => TokenKind::Semicolon,
            Backslash => TokenKind::Escape,
            Colon => TokenKind::Colon,
            Query => TokenKind::Query,
            Period => TokenKind::Period,
            Plus => TokenKind::Plus,
            Minus => TokenKind::Minus,
            Mult => TokenKind::Mult,
            Div => TokenKind::Div,
            Rem => TokenKind::Rem,
            Less => TokenKind::Less,
            More => TokenKind::More,
            Assign => TokenKind::Assign,
            BitXor => TokenKind::BitXor,
            BitAnd => TokenKind::BitAnd,
            BitOr => TokenKind::BitOr,
            Not => TokenKind::Not,
            Invert => TokenKind::Invert,

            ClassKw => TokenKind::Class,
            StructKw => TokenKind::Struct,
            UnionKw => TokenKind::Union,
            EnumKw => TokenKind::Enum,
            TypedefKw => TokenKind::Typedef,
            TemplateKw => TokenKind::Template,
            NamespaceKw => TokenKind::KwNamespace,
            UsingKw => TokenKind::KwUsing,
            InlineKw => TokenKind::KwInline,
            StaticKw => TokenKind::KwStatic,
            ExternKw => TokenKind::KwExtern,
            FriendKw => TokenKind::KwFriend,
            VirtualKw => TokenKind::KwVirtual,
            MutableKw => TokenKind::Mutable,
            ConstKw => TokenKind::Const,
            RegisterKw => TokenKind::KwRegister,
            PublicKw => TokenKind::KwPublic,
            PrivateKw => TokenKind::KwPrivate,
            ProtectedKw => TokenKind::KwProtected,
            OperatorKw => TokenKind::KwOperator,
            VoidKw => TokenKind::Void,
            CharKw => TokenKind::Char,
            ShortKw => TokenKind::Short,
            IntKw => TokenKind::Int,
            LongKw => TokenKind::Long,
            UnsignedKw => TokenKind::Unsigned,
            IfKw => TokenKind::If,
            ElseKw => TokenKind::Else,
            SwitchKw => TokenKind::Switch,
            CaseKw => TokenKind::Case,
            DefaultKw => TokenKind::Default,
            ForKw => TokenKind::For,
            DoKw => TokenKind::Do,
            WhileKw => TokenKind::While,
            BreakKw => TokenKind::Break,
            ContinueKw => TokenKind::Continue,
            GotoKw => TokenKind::Goto,
            ReturnKw => TokenKind::Return,
            NewKw => TokenKind::New,
            DeleteKw => TokenKind::Delete,
            ThisKw => TokenKind::This,
            SizeofKw => TokenKind::Sizeof,
            DynCastKw => TokenKind::DynCast,
            TrueKw | FalseKw => TokenKind::Boolean,
        }
    }
}
