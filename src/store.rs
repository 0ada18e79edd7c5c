use crate::error::AppResult;
use crate::schemas::{Member, Payment};
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{options::ReplaceOptions, Client, Collection};

const DATABASE: &str = "AssociationManager";

/// Where registry changes are written through to. `Memory` keeps nothing.
#[derive(Clone)]
pub enum Store {
    Memory,
    Mongo(Client),
}

impl Store {
    pub async fn connect(uri: Option<&str>) -> AppResult<Self> {
        match uri {
            None => {
                tracing::warn!("MONGODB_URI not set, data will not survive a restart");
                Ok(Store::Memory)
            }
            Some(uri) => {
                let client = Client::with_uri_str(uri).await?;
                tracing::info!(database = DATABASE, "connected to mongodb");
                Ok(Store::Mongo(client))
            }
        }
    }

    pub async fn load(&self) -> AppResult<(Vec<Member>, Vec<Payment>)> {
        match self {
            Store::Memory => Ok((Vec::new(), Vec::new())),
            Store::Mongo(client) => {
                let members: Vec<Member> =
                    member_collection(client).find(None, None).await?.try_collect().await?;
                let payments: Vec<Payment> =
                    payment_collection(client).find(None, None).await?.try_collect().await?;
                tracing::info!(
                    members = members.len(),
                    payments = payments.len(),
                    "registry loaded"
                );
                Ok((members, payments))
            }
        }
    }

    pub async fn save_member(&self, member: &Member) -> AppResult<()> {
        if let Store::Mongo(client) = self {
            let options = ReplaceOptions::builder().upsert(true).build();
            member_collection(client)
                .replace_one(by_id(&member.id), member, options)
                .await?;
        }
        Ok(())
    }

    pub async fn delete_member(&self, id: &str) -> AppResult<()> {
        if let Store::Mongo(client) = self {
            member_collection(client).delete_one(by_id(id), None).await?;
        }
        Ok(())
    }

    pub async fn save_payment(&self, payment: &Payment) -> AppResult<()> {
        if let Store::Mongo(client) = self {
            let options = ReplaceOptions::builder().upsert(true).build();
            payment_collection(client)
                .replace_one(by_id(&payment.id), payment, options)
                .await?;
        }
        Ok(())
    }

    pub async fn delete_payment(&self, id: &str) -> AppResult<()> {
        if let Store::Mongo(client) = self {
            payment_collection(client).delete_one(by_id(id), None).await?;
        }
        Ok(())
    }
}

fn by_id(id: &str) -> Document {
    doc! { "id": id }
}

fn member_collection(client: &Client) -> Collection<Member> {
    client.database(DATABASE).collection("Members")
}

fn payment_collection(client: &Client) -> Collection<Payment> {
    client.database(DATABASE).collection("Payments")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::tests::payment;
    use crate::schemas::PaymentStatus;

    #[actix_web::test]
    async fn memory_store_accepts_writes_and_loads_nothing() {
        let store = Store::connect(None).await.unwrap();
        let record = payment("p1", "m1", 0, 2024, 30.0, PaymentStatus::Paid);
        store.save_payment(&record).await.unwrap();
        store.delete_payment(&record.id).await.unwrap();
        let (members, payments) = store.load().await.unwrap();
        assert!(members.is_empty());
        assert!(payments.is_empty());
    }

    #[test]
    fn records_are_addressed_by_their_own_id() {
        let filter = by_id("p-42");
        assert_eq!(filter.get_str("id").unwrap(), "p-42");
        assert_eq!(filter.len(), 1);
    }
}
