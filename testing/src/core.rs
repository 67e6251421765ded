use async_trait::async_trait;
use lingocore::{
    error::BackendError,
    store::{
        KeyedStore,
        RangeQuery,
    },
};
use mockall::mock;
use serde_json::Value;

mock! {
    pub Store {}

    #[async_trait]
    impl KeyedStore for Store {
        async fn range_query(
            &self,
            query: &RangeQuery,
        ) -> Result<Vec<(String, Value)>, BackendError>;
        async fn get(
            &self,
            path: &str,
        ) -> Result<Option<Value>, BackendError>;
        async fn write(
            &self,
            path: &str,
            value: Value,
        ) -> Result<(), BackendError>;
        async fn delete(
            &self,
            path: &str,
        ) -> Result<(), BackendError>;
    }
}
