/// Position in source code (line and column, both 1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Range spanning a region of source code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// The primitive DDP types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Zahl,
    Kommazahl,
    Boolean,
    Buchstabe,
    Text,
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Zahl => write!(f, "Zahl"),
            Primitive::Kommazahl => write!(f, "Kommazahl"),
            Primitive::Boolean => write!(f, "Boolean"),
            Primitive::Buchstabe => write!(f, "Buchstabe"),
            Primitive::Text => write!(f, "Text"),
        }
    }
}

/// A DDP type: a primitive or a list thereof.
/// Types compare structurally, there is no subtyping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdpType {
    pub primitive: Primitive,
    pub is_list: bool,
}

impl DdpType {
    pub const fn primitive(primitive: Primitive) -> Self {
        Self { primitive, is_list: false }
    }

    pub const fn list(primitive: Primitive) -> Self {
        Self { primitive, is_list: true }
    }

    pub const ZAHL: DdpType = DdpType::primitive(Primitive::Zahl);
    pub const KOMMAZAHL: DdpType = DdpType::primitive(Primitive::Kommazahl);
    pub const BOOLEAN: DdpType = DdpType::primitive(Primitive::Boolean);
    pub const BUCHSTABE: DdpType = DdpType::primitive(Primitive::Buchstabe);
    pub const TEXT: DdpType = DdpType::primitive(Primitive::Text);

    pub fn is_numeric(&self) -> bool {
        !self.is_list && matches!(self.primitive, Primitive::Zahl | Primitive::Kommazahl)
    }

    /// Text and all list types live on the heap
    pub fn is_heap(&self) -> bool {
        self.is_list || self.primitive == Primitive::Text
    }

    pub fn element_type(&self) -> DdpType {
        DdpType::primitive(self.primitive)
    }
}

impl std::fmt::Display for DdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_list {
            match self.primitive {
                Primitive::Zahl => write!(f, "Zahlen Liste"),
                Primitive::Kommazahl => write!(f, "Kommazahlen Liste"),
                Primitive::Boolean => write!(f, "Boolean Liste"),
                Primitive::Buchstabe => write!(f, "Buchstaben Liste"),
                Primitive::Text => write!(f, "Text Liste"),
            }
        } else {
            write!(f, "{}", self.primitive)
        }
    }
}

/// Extra information carried by `AliasParameter` tokens: the type the
/// parameter hole expects. Filled in by the parser from the parameter
/// list of the surrounding function declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasInfo {
    pub typ: DdpType,
    pub is_reference: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,
    Comment,

    // Literals and names
    Int,
    Float,
    Char,
    String,
    Identifier,
    AliasParameter,
    Wahr,
    Falsch,

    // Punctuation
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    Negate, // '-'

    // Articles and grammatical glue
    Der,
    Die,
    Das,
    Dem,
    Den,
    Ist,
    Sind,
    Eine,
    Einen,
    Einem,
    Einer,

    // Type names
    Zahl,
    Kommazahl,
    Boolean,
    Buchstabe,
    Text,
    Liste,
    Zahlen,
    Kommazahlen,
    Buchstaben,
    Referenz,
    Leere,
    Standardwert,

    // Operators
    Plus,
    Minus,
    Mal,
    Durch,
    Modulo,
    Hoch,
    Logarithmus,
    Zur,
    Basis,
    Betrag,
    Laenge,  // Länge
    Groesse, // Größe
    Verkettet,
    Mit,
    Und,
    Oder,
    Nicht,
    Negiere,
    Logisch,
    Kontra,
    Um,
    Bit,
    Nach,
    Links,
    Rechts,
    Verschoben,
    Gleich,
    Ungleich,
    Kleiner,
    Groesser, // größer
    Als,
    Von,
    Bis,
    Stelle,
    Aus,
    Besteht,
    Enthaelt, // enthält

    // Statement keywords
    Wenn,
    Dann,
    Sonst,
    Solange,
    Mache,
    Wiederhole,
    Fuer, // Für
    Jede,
    Jeden,
    Jedes,
    In,
    Schrittgroesse, // Schrittgröße
    Gib,
    Zurueck, // zurück
    Kehre,
    Speichere,
    Binde,
    Ein, // closes a Binde directive
    Funktion,
    Parameter,
    Parametern,
    Typ,
    Vom,
    Gibt,
    Nichts,
    Macht,
    Definiert,
    Kann,
    So,
    Benutzt,
    Werden,
}

/// Keyword lookup, used by the scanner after reading an identifier.
/// Exact (lowercased) spelling decides; capitalisation is only ever
/// diagnosed in strict mode, never used to tell keywords apart.
pub fn keyword_kind(literal: &str) -> TokenKind {
    use TokenKind::*;
    match literal.to_lowercase().as_str() {
        "wahr" => Wahr,
        "falsch" => Falsch,
        "der" => Der,
        "die" => Die,
        "das" => Das,
        "dem" => Dem,
        "den" => Den,
        "ist" => Ist,
        "sind" => Sind,
        "eine" => Eine,
        "einen" => Einen,
        "einem" => Einem,
        "einer" => Einer,
        "zahl" => Zahl,
        "kommazahl" => Kommazahl,
        "boolean" => Boolean,
        "buchstabe" => Buchstabe,
        "text" => Text,
        "liste" => Liste,
        "zahlen" => Zahlen,
        "kommazahlen" => Kommazahlen,
        "buchstaben" => Buchstaben,
        "referenz" => Referenz,
        "leere" => Leere,
        "standardwert" => Standardwert,
        "plus" => Plus,
        "minus" => Minus,
        "mal" => Mal,
        "durch" => Durch,
        "modulo" => Modulo,
        "hoch" => Hoch,
        "logarithmus" => Logarithmus,
        "zur" => Zur,
        "basis" => Basis,
        "betrag" => Betrag,
        "länge" => Laenge,
        "größe" => Groesse,
        "verkettet" => Verkettet,
        "mit" => Mit,
        "und" => Und,
        "oder" => Oder,
        "nicht" => Nicht,
        "negiere" => Negiere,
        "logisch" => Logisch,
        "kontra" => Kontra,
        "um" => Um,
        "bit" => Bit,
        "nach" => Nach,
        "links" => Links,
        "rechts" => Rechts,
        "verschoben" => Verschoben,
        "gleich" => Gleich,
        "ungleich" => Ungleich,
        "kleiner" => Kleiner,
        "größer" => Groesser,
        "als" => Als,
        "von" => Von,
        "bis" => Bis,
        "stelle" => Stelle,
        "aus" => Aus,
        "besteht" => Besteht,
        "enthält" => Enthaelt,
        "wenn" => Wenn,
        "dann" => Dann,
        "sonst" => Sonst,
        "solange" => Solange,
        "mache" => Mache,
        "wiederhole" => Wiederhole,
        "für" => Fuer,
        "jede" => Jede,
        "jeden" => Jeden,
        "jedes" => Jedes,
        "in" => In,
        "schrittgröße" => Schrittgroesse,
        "gib" => Gib,
        "zurück" => Zurueck,
        "kehre" => Kehre,
        "speichere" => Speichere,
        "binde" => Binde,
        "ein" => Ein,
        "funktion" => Funktion,
        "parameter" => Parameter,
        "parametern" => Parametern,
        "typ" => Typ,
        "vom" => Vom,
        "gibt" => Gibt,
        "nichts" => Nichts,
        "macht" => Macht,
        "definiert" => Definiert,
        "kann" => Kann,
        "so" => So,
        "benutzt" => Benutzt,
        "werden" => Werden,
        _ => Identifier,
    }
}

/// A single DDP token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// the literal text from which the token was scanned
    pub literal: String,
    /// how many levels the token's line is indented
    pub indent: usize,
    /// the file from which the token was scanned
    pub file: String,
    pub range: Range,
    /// only present on AliasParameter tokens
    pub alias_info: Option<AliasInfo>,
}

impl Token {
    pub fn new(kind: TokenKind, literal: String, indent: usize, file: String, range: Range) -> Self {
        Self { kind, literal, indent, file, range, alias_info: None }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.literal)
    }
}
