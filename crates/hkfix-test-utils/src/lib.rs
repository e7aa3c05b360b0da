//! Testing utilities for hkfix workspace
//!
//! Shared fixtures and helpers for loading units against an index.

#![allow(missing_docs)]

use hkfix_frontend::{exported_symbols, CompilationUnit, FrontEnd, ScalaFrontEnd};
use hkfix_source::{EditSet, SourceText, UnitId};
use hkfix_symbol::ProgramIndex;
use std::path::PathBuf;

/// Legacy generated service without a holder
pub const LEGACY_SERVICE: &str = "package com.example.api

import com.twitter.finagle.thrift.ThriftService
import com.twitter.util.Future

trait Greeter[Future] extends ThriftService {
  def greet(name: String, times: Int): Future[String]
  def ping(): Future[Unit]
}
";

/// Legacy generated service with a holder that already carries members
pub const LEGACY_SERVICE_WITH_HOLDER: &str = "package com.example.api

import com.twitter.finagle.thrift.ThriftService
import com.twitter.util.Future

trait Greeter[Future] extends ThriftService {
  def greet(name: String): Future[String]
}

object Greeter {
  val ServiceName: String = \"greeter\"
}
";

/// Modern generated service without a holder
pub const MODERN_SERVICE: &str = "package com.example.api

trait Greeter[F[_]] {
  def greet(name: String): F[String]
  def ping(): F[Unit]
}
";

/// Modern generated service whose holder already has every binding
pub const MODERN_SERVICE_COMPLETE: &str = "package com.example.api

import cats.data.ReaderT
import cats.tagless.FunctorK
import cats.~>

trait Greeter[F[_]] {
  def greet(name: String): F[String]
}

object Greeter {
  implicit def GreeterReaderT[F[_]]: Greeter[ReaderT[F, Greeter[F], *]] = ???
  implicit val GreeterFunctorK: FunctorK[Greeter] = ???
}
";

/// An ordinary trait that no rule touches
pub const ORDINARY_TRAIT: &str = "package com.example.util

trait Clock {
  def now(): Long
  def zone: String = \"UTC\"
}
";

/// Service consumer referencing `Greeter` through an explicit import
pub const CONSUMER: &str = "package com.example.app

import com.example.api.Greeter

class GreeterClient(underlying: Greeter[IO]) {
  def hello: IO[String] = underlying.greet(\"world\")
}
";

/// Load `source` as unit `id` against `index`
#[must_use]
pub fn load_unit(index: &ProgramIndex, id: &str, source: &str) -> CompilationUnit {
    ScalaFrontEnd::new().load(
        UnitId::new(id),
        PathBuf::from(id),
        SourceText::new(source),
        index,
    )
}

/// Load a unit and register its symbols
///
/// # Panics
/// Panics if the unit's symbols clash with another unit's
pub fn register_unit(index: &ProgramIndex, id: &str, source: &str) -> CompilationUnit {
    let unit = load_unit(index, id, source);
    index
        .register_unit(unit.id(), unit.package_name(), exported_symbols(&unit))
        .unwrap();
    unit
}

/// Apply an edit set to a unit's text
///
/// # Panics
/// Panics if the set does not apply
#[must_use]
pub fn apply(unit: &CompilationUnit, edits: &EditSet) -> String {
    edits.apply(unit.source()).unwrap().as_str().to_string()
}
