use serde::{Deserialize, Serialize};

/// One node of a robot's instruction tree, tagged by the parser's `type` field.
///
/// Unknown tags deserialize to [`Statement::Unsupported`] so a program still loads; the actor
/// reports it as an invalid instruction when it reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    #[serde(rename = "mover")]
    Move,
    #[serde(rename = "derecha")]
    TurnRight,
    #[serde(rename = "tomarFlor")]
    TakeFlower,
    #[serde(rename = "tomarPapel")]
    TakePaper,
    #[serde(rename = "depositarFlor")]
    DropFlower,
    #[serde(rename = "depositarPapel")]
    DropPaper,
    #[serde(rename = "Pos")]
    Position { x: Expression, y: Expression },
    #[serde(rename = "Informar")]
    Report { values: Vec<Expression> },
    #[serde(rename = "asignacion")]
    Assign {
        identifier: String,
        value: Expression,
    },
    #[serde(rename = "repetir")]
    Repeat {
        times: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    #[serde(rename = "mientras")]
    While {
        condition: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    #[serde(rename = "si")]
    If {
        condition: Expression,
        #[serde(default)]
        body: Vec<Statement>,
        #[serde(default)]
        else_body: Vec<Statement>,
    },
    #[serde(rename = "invocar")]
    Call {
        identifier: String,
        #[serde(default)]
        arguments: Vec<Expression>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    #[serde(rename = "numero")]
    Number { value: i64 },
    #[serde(rename = "booleano")]
    Bool { value: bool },
    #[serde(rename = "variable")]
    Variable { identifier: String },
    #[serde(rename = "HayFlorEnLaEsquina")]
    FlowerOnCorner,
    #[serde(rename = "HayPapelEnLaEsquina")]
    PaperOnCorner,
    #[serde(rename = "HayFlorEnLaBolsa")]
    FlowerInBag,
    #[serde(rename = "HayPapelEnLaBolsa")]
    PaperInBag,
    #[serde(rename = "PosAv")]
    Avenue,
    #[serde(rename = "PosCa")]
    Street,
    #[serde(rename = "binaria")]
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    #[serde(rename = "negacion")]
    Not { operand: Box<Expression> },
}

impl Expression {
    pub fn number(value: i64) -> Self {
        Self::Number { value }
    }

    pub fn boolean(value: bool) -> Self {
        Self::Bool { value }
    }

    pub fn variable(identifier: impl Into<String>) -> Self {
        Self::Variable {
            identifier: identifier.into(),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "&")]
    And,
    #[serde(rename = "|")]
    Or,
}
