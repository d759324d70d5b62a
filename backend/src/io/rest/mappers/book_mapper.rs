use crate::domain::models::Book as DomainBook;
use shared::Book as SharedBook;

pub struct BookMapper;

impl BookMapper {
    pub fn to_dto(domain: &DomainBook) -> SharedBook {
        SharedBook {
            id: domain.id,
            title: domain.title.clone(),
            description: domain.description.clone(),
            borrowing_price: domain.borrowing_price,
        }
    }
}
