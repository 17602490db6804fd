use crate::scanner::{Pos, Tok, Token};
use mj_ast::*;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("{pos:?}: expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: Tok,
        pos: Pos,
    },
    #[error("{0}")]
    Scan(#[from] crate::scanner::ScanError),
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ids: NodeIdGen,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            ids: NodeIdGen::new(),
        }
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].tok
    }

    fn peek_pos(&self) -> Pos {
        self.tokens[self.pos].pos
    }

    fn bump(&mut self) -> Tok {
        let t = self.tokens[self.pos].tok.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: Tok, what: &'static str) -> Result<(), ParseError> {
        if *self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::Unexpected {
                expected: what,
                found: self.peek().clone(),
                pos: self.peek_pos(),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(ParseError::Unexpected {
                expected: "identifier",
                found: other,
                pos: self.peek_pos(),
            }),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let main_class = self.parse_main_class()?;
        let mut classes = Vec::new();
        while *self.peek() != Tok::Eof {
            classes.push(self.parse_class_decl()?);
        }
        Ok(Program {
            main_class,
            classes,
        })
    }

    fn parse_main_class(&mut self) -> Result<MainClass, ParseError> {
        self.expect(Tok::Class, "`class`")?;
        let name = self.expect_ident()?;
        self.expect(Tok::LBrace, "`{`")?;
        self.expect(Tok::Public, "`public`")?;
        self.expect(Tok::Static, "`static`")?;
        self.expect(Tok::Void, "`void`")?;
        self.expect(Tok::Main, "`main`")?;
        self.expect(Tok::LParen, "`(`")?;
        self.expect(Tok::String, "`String`")?;
        self.expect(Tok::LBracket, "`[`")?;
        self.expect(Tok::RBracket, "`]`")?;
        let arg_name = self.expect_ident()?;
        self.expect(Tok::RParen, "`)`")?;
        self.expect(Tok::LBrace, "`{`")?;
        let body = self.parse_statement()?;
        self.expect(Tok::RBrace, "`}`")?;
        self.expect(Tok::RBrace, "`}`")?;
        Ok(MainClass {
            name,
            arg_name,
            body,
        })
    }

    fn parse_class_decl(&mut self) -> Result<ClassDecl, ParseError> {
        self.expect(Tok::Class, "`class`")?;
        let name = self.expect_ident()?;
        let parent = if *self.peek() == Tok::Extends {
            self.bump();
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(Tok::LBrace, "`{`")?;

        let mut fields = Vec::new();
        while self.looks_like_var_decl() {
            fields.push(self.parse_var_decl()?);
        }

        let mut methods = Vec::new();
        while *self.peek() == Tok::Public {
            methods.push(self.parse_method_decl()?);
        }

        self.expect(Tok::RBrace, "`}`")?;
        Ok(ClassDecl {
            name,
            parent,
            fields,
            methods,
        })
    }

    /// A field/local declaration is `Type Identifier ;`. Distinguishing it
    /// from the start of a statement (also starting with an identifier)
    /// needs one token of lookahead beyond `Type`: a following identifier
    /// means a declaration, anything else (notably `=` or `[`) means a
    /// statement using that name as an lvalue.
    fn looks_like_var_decl(&self) -> bool {
        match self.peek() {
            Tok::Int | Tok::Boolean => true,
            Tok::Ident(_) => matches!(self.tokens.get(self.pos + 1).map(|t| &t.tok), Some(Tok::Ident(_))),
            _ => false,
        }
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect(Tok::Semi, "`;`")?;
        Ok(VarDecl { ty, name })
    }

    fn parse_type(&mut self) -> Result<TypeName, ParseError> {
        match self.peek().clone() {
            Tok::Int => {
                self.bump();
                if *self.peek() == Tok::LBracket {
                    self.bump();
                    self.expect(Tok::RBracket, "`]`")?;
                    Ok(TypeName::IntArray)
                } else {
                    Ok(TypeName::Int)
                }
            }
            Tok::Boolean => {
                self.bump();
                Ok(TypeName::Boolean)
            }
            Tok::Ident(name) => {
                self.bump();
                Ok(TypeName::Named(name))
            }
            other => Err(ParseError::Unexpected {
                expected: "type",
                found: other,
                pos: self.peek_pos(),
            }),
        }
    }

    fn parse_method_decl(&mut self) -> Result<MethodDecl, ParseError> {
        self.expect(Tok::Public, "`public`")?;
        let return_type = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect(Tok::LParen, "`(`")?;
        let mut params = Vec::new();
        if *self.peek() != Tok::RParen {
            loop {
                let ty = self.parse_type()?;
                let pname = self.expect_ident()?;
                params.push(VarDecl { ty, name: pname });
                if *self.peek() == Tok::Comma {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.expect(Tok::RParen, "`)`")?;
        self.expect(Tok::LBrace, "`{`")?;

        let mut locals = Vec::new();
        while self.looks_like_var_decl() {
            locals.push(self.parse_var_decl()?);
        }

        let mut body = Vec::new();
        while !self.at_return() {
            body.push(self.parse_statement()?);
        }

        self.expect(Tok::Return, "`return`")?;
        let return_expr = self.parse_expression()?;
        self.expect(Tok::Semi, "`;`")?;
        self.expect(Tok::RBrace, "`}`")?;

        Ok(MethodDecl {
            return_type,
            name,
            params,
            locals,
            body,
            return_expr,
        })
    }

    fn at_return(&self) -> bool {
        *self.peek() == Tok::Return
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().clone() {
            Tok::LBrace => {
                self.bump();
                let mut stmts = Vec::new();
                while *self.peek() != Tok::RBrace {
                    stmts.push(self.parse_statement()?);
                }
                self.expect(Tok::RBrace, "`}`")?;
                Ok(Stmt::Block(stmts))
            }
            Tok::If => {
                self.bump();
                self.expect(Tok::LParen, "`(`")?;
                let cond = self.parse_expression()?;
                self.expect(Tok::RParen, "`)`")?;
                let then_branch = Box::new(self.parse_statement()?);
                self.expect(Tok::Else, "`else`")?;
                let else_branch = Box::new(self.parse_statement()?);
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            Tok::While => {
                self.bump();
                self.expect(Tok::LParen, "`(`")?;
                let cond = self.parse_expression()?;
                self.expect(Tok::RParen, "`)`")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { cond, body })
            }
            Tok::SystemOutPrintln => {
                self.bump();
                self.expect(Tok::LParen, "`(`")?;
                let e = self.parse_expression()?;
                self.expect(Tok::RParen, "`)`")?;
                self.expect(Tok::Semi, "`;`")?;
                Ok(Stmt::Print(e))
            }
            Tok::Ident(name) => {
                self.bump();
                if *self.peek() == Tok::LBracket {
                    self.bump();
                    let index = self.parse_expression()?;
                    self.expect(Tok::RBracket, "`]`")?;
                    self.expect(Tok::Assign, "`=`")?;
                    let value = self.parse_expression()?;
                    self.expect(Tok::Semi, "`;`")?;
                    Ok(Stmt::ArrayAssign {
                        target: name,
                        index,
                        value,
                    })
                } else {
                    self.expect(Tok::Assign, "`=`")?;
                    let value = self.parse_expression()?;
                    self.expect(Tok::Semi, "`;`")?;
                    Ok(Stmt::Assign {
                        target: name,
                        value,
                    })
                }
            }
            other => Err(ParseError::Unexpected {
                expected: "statement",
                found: other,
                pos: self.peek_pos(),
            }),
        }
    }

    fn mk(&self, kind: ExprKind) -> Expr {
        Expr::new(self.ids.next(), kind)
    }

    /// `Expression := AndTerm ( "&&" AndTerm )*`
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_rel_expr()?;
        while *self.peek() == Tok::And {
            self.bump();
            let right = self.parse_rel_expr()?;
            left = self.mk(ExprKind::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// `RelExpr := AddExpr ( "<" AddExpr )*`
    fn parse_rel_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add_expr()?;
        while *self.peek() == Tok::Less {
            self.bump();
            let right = self.parse_add_expr()?;
            left = self.mk(ExprKind::Binary {
                op: BinaryOp::Less,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// `AddExpr := MulExpr ( ("+"|"-") MulExpr )*`
    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinaryOp::Plus,
                Tok::Minus => BinaryOp::Minus,
                _ => break,
            };
            self.bump();
            let right = self.parse_mul_expr()?;
            left = self.mk(ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// `MulExpr := Unary ( "*" Unary )*`
    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while *self.peek() == Tok::Star {
            self.bump();
            let right = self.parse_unary()?;
            left = self.mk(ExprKind::Binary {
                op: BinaryOp::Times,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if *self.peek() == Tok::Bang {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(self.mk(ExprKind::Not(Box::new(inner))));
        }
        self.parse_postfix()
    }

    /// `Postfix := Primary ( ".length" | "." Ident "(" Args ")" | "[" Expr "]" )*`
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.parse_primary()?;
        loop {
            match self.peek().clone() {
                Tok::Dot => {
                    self.bump();
                    if *self.peek() == Tok::Length {
                        self.bump();
                        e = self.mk(ExprKind::ArrayLength(Box::new(e)));
                    } else {
                        let method = self.expect_ident()?;
                        self.expect(Tok::LParen, "`(`")?;
                        let mut args = Vec::new();
                        if *self.peek() != Tok::RParen {
                            loop {
                                args.push(self.parse_expression()?);
                                if *self.peek() == Tok::Comma {
                                    self.bump();
                                    continue;
                                }
                                break;
                            }
                        }
                        self.expect(Tok::RParen, "`)`")?;
                        e = self.mk(ExprKind::MethodCall {
                            receiver: Box::new(e),
                            method,
                            args,
                        });
                    }
                }
                Tok::LBracket => {
                    self.bump();
                    let index = self.parse_expression()?;
                    self.expect(Tok::RBracket, "`]`")?;
                    e = self.mk(ExprKind::ArrayIndex {
                        array: Box::new(e),
                        index: Box::new(index),
                    });
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Tok::IntLit(n) => {
                self.bump();
                Ok(self.mk(ExprKind::IntLiteral(n)))
            }
            Tok::True => {
                self.bump();
                Ok(self.mk(ExprKind::True))
            }
            Tok::False => {
                self.bump();
                Ok(self.mk(ExprKind::False))
            }
            Tok::This => {
                self.bump();
                Ok(self.mk(ExprKind::This))
            }
            Tok::Ident(name) => {
                self.bump();
                Ok(self.mk(ExprKind::Identifier(name)))
            }
            Tok::New => {
                self.bump();
                match self.peek().clone() {
                    Tok::Int => {
                        self.bump();
                        self.expect(Tok::LBracket, "`[`")?;
                        let size = self.parse_expression()?;
                        self.expect(Tok::RBracket, "`]`")?;
                        Ok(self.mk(ExprKind::NewIntArray(Box::new(size))))
                    }
                    Tok::Ident(name) => {
                        self.bump();
                        self.expect(Tok::LParen, "`(`")?;
                        self.expect(Tok::RParen, "`)`")?;
                        Ok(self.mk(ExprKind::NewObject(name)))
                    }
                    other => Err(ParseError::Unexpected {
                        expected: "`int` or class name after `new`",
                        found: other,
                        pos: self.peek_pos(),
                    }),
                }
            }
            Tok::LParen => {
                self.bump();
                let inner = self.parse_expression()?;
                self.expect(Tok::RParen, "`)`")?;
                Ok(self.mk(ExprKind::Paren(Box::new(inner))))
            }
            other => Err(ParseError::Unexpected {
                expected: "expression",
                found: other,
                pos: self.peek_pos(),
            }),
        }
    }
}
