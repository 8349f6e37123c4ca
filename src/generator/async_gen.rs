//! Async surface over [`Generator`]
//!
//! The engine is the same; each method runs one resumption to completion
//! and resolves immediately. `None` stands for async exhaustion.

use serde::{Deserialize, Serialize};

use super::{Generator, GeneratorState};
use crate::errors::EngineResult;
use crate::interpreter::{ExcVal, Val};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncGenerator {
    inner: Generator,
}

impl AsyncGenerator {
    pub fn new(source: &str, args: Vec<Val>, kwargs: Vec<(String, Val)>) -> EngineResult<Self> {
        Generator::new(source, args, kwargs).map(Self::from_generator)
    }

    pub fn from_generator(inner: Generator) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> Generator {
        self.inner
    }

    pub fn generator(&self) -> &Generator {
        &self.inner
    }

    pub async fn anext(&mut self) -> EngineResult<Option<Val>> {
        self.inner.next_value().map(GeneratorState::yielded)
    }

    pub async fn asend(&mut self, value: Val) -> EngineResult<Option<Val>> {
        self.inner.send(value).map(GeneratorState::yielded)
    }

    pub async fn athrow(&mut self, exc: ExcVal) -> EngineResult<Option<Val>> {
        self.inner.throw(exc).map(GeneratorState::yielded)
    }

    pub async fn aclose(&mut self) -> EngineResult<()> {
        self.inner.close()
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use tokio_test::block_on;

    const TICKER: &str = "async def ticker(limit):
    for i in range(limit):
        await i
        received = yield i * 10
        if received is not None:
            yield received
";

    #[test]
    fn test_anext_until_exhausted() {
        let mut ticker = AsyncGenerator::new(TICKER, vec![Val::Int(2)], Vec::new()).unwrap();
        assert!(ticker.generator().is_async());

        assert_eq!(block_on(ticker.anext()).unwrap(), Some(Val::Int(0)));
        assert_eq!(block_on(ticker.anext()).unwrap(), Some(Val::Int(10)));
        assert_eq!(block_on(ticker.anext()).unwrap(), None);
        assert!(ticker.generator().is_closed());
    }

    #[test]
    fn test_asend_and_copy_diverge() {
        let mut ticker = AsyncGenerator::new(TICKER, vec![Val::Int(3)], Vec::new()).unwrap();
        block_on(ticker.anext()).unwrap();
        let mut twin = ticker.copy();

        assert_eq!(block_on(ticker.asend(Val::str("hi"))).unwrap(), Some(Val::str("hi")));
        assert_eq!(block_on(twin.anext()).unwrap(), Some(Val::Int(10)));
    }

    #[test]
    fn test_athrow_unhandled_closes() {
        let mut ticker = AsyncGenerator::new(TICKER, vec![Val::Int(3)], Vec::new()).unwrap();
        block_on(ticker.anext()).unwrap();

        let err = block_on(ticker.athrow(ExcVal::message("ValueError", "stop"))).unwrap_err();
        assert!(matches!(err, EngineError::UserException { ref exc, .. } if exc.kind == "ValueError"));
        assert!(ticker.generator().is_closed());
        block_on(ticker.aclose()).unwrap();
    }
}
